//! Lesson module - the guided practice engine
//!
//! # Architecture
//!
//! - `definition` / `loader` - authored lesson content, JSON loading and linting
//! - `arbiter` - classifies learner moves against a step (pure)
//! - `resolver` - turns scripted computer moves into legal moves (pure)
//! - `scoring` - correct/mistake counters and difficulty adaptation
//! - `session` / `timer` - per-attempt state and the single step timer
//! - `machine` - the step state machine that owns all of the above
//! - `driver` - runs a machine on one task, racing commands against its timer
//! - `events` - observer callbacks and the renderer payload
//!
//! # Data Flow
//!
//! ```text
//! learner move -> arbiter -> rules adapter -> machine (position, counters)
//!              -> animations -> next step (maybe resolver) -> observer
//! ```

pub mod arbiter;
pub mod definition;
pub mod driver;
pub mod error;
pub mod events;
pub mod loader;
pub mod machine;
pub mod resolver;
pub mod scoring;
pub mod session;
pub mod timer;

pub use arbiter::{classify, Verdict};
pub use definition::{ChoiceOption, Guidance, LessonDefinition, Step, StepAction, StepKind};
pub use driver::{LessonCommand, LessonDriver, LessonHandle};
pub use error::{LessonError, LessonResult, ResolveError, ResolveResult};
pub use events::{
    ChannelObserver, LessonEvent, LessonObserver, MoveOutcome, StepView, TracingObserver,
};
pub use loader::{lint, load_lesson, ContentIssue, LessonLibrary};
pub use machine::{LessonMachine, LessonPhase};
pub use resolver::{
    recovery_move, Interpretation, MoveResolver, NotationStrategy, RemapTable, ResolvedMove,
};
pub use scoring::{
    Difficulty, ScoringThresholds, SessionScorer, SessionSummary, SuccessCriteria,
};
pub use session::{ComputerMoveReport, SessionState};
pub use timer::{TimerHandle, TimerSlot};
