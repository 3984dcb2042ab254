//! XFChess guided practice lessons
//!
//! Scripted-yet-interactive chess lessons: the learner plays the moves a step
//! asks for, the computer answers from the script, explanations and choices
//! branch the lesson, and a scorer recommends the next difficulty.
//!
//! # Modules
//!
//! - [`lesson`] - step state machine, move arbitration, computer move
//!   resolution, scoring and the host-facing observer contract
//! - [`rendering`] - animation orchestration against a renderer trait
//! - [`core`] - settings, logging and error types
//!
//! Chess rules come from the `chess-logic-shared` workspace crate.

pub mod core;
pub mod lesson;
pub mod rendering;

pub use chess_logic_shared as rules;
