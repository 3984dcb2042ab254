//! Lesson step state machine
//!
//! [`LessonMachine`] owns a lesson attempt: the [`SessionState`], the single
//! step timer and the animations started for the current step. Every
//! transition goes through it, one at a time.
//!
//! # Phases
//!
//! ```text
//! NotStarted --start--> (enter step 0)
//!
//! enter user-move      -> AwaitingUserMove   --allowed move--> next step
//! enter computer-move  -> ComputerThinking   --reply played--> next step
//! enter explanation    -> ShowingExplanation --advance/timer-> next step
//! enter choice         -> AwaitingChoice     --select--------> chosen step
//!                                            --timer---------> next step
//! past the last step   -> Completed
//! broken branch target -> Failed
//! ```
//!
//! Leaving a step always cancels its pending timer and in-flight animations
//! before the next step is entered.

use crate::core::settings::EngineSettings;
use crate::lesson::arbiter::{classify, Verdict};
use crate::lesson::definition::{LessonDefinition, Step, StepAction};
use crate::lesson::error::{LessonError, LessonResult};
use crate::lesson::events::{LessonObserver, MoveOutcome, StepView};
use crate::lesson::resolver::{recovery_move, MoveResolver, RemapTable};
use crate::lesson::scoring::{SessionScorer, SessionSummary};
use crate::lesson::session::{ComputerMoveReport, SessionState};
use crate::lesson::timer::{TimerHandle, TimerSlot};
use crate::rendering::animation::{AnimationHandle, AnimationOrchestrator};
use crate::rendering::surface::BoardSurface;
use chess_logic_shared::{MoveDescriptor, Position, RulesError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

const HINT_MESSAGE: &str = "Right piece! Try a different square.";
const WRONG_PIECE_MESSAGE: &str = "That piece isn't part of this idea. Look for another one.";
const BLOCKED_MESSAGE: &str = "That move isn't allowed in this lesson.";
const ILLEGAL_MESSAGE: &str = "That move isn't legal here.";

/// Where a lesson attempt currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LessonPhase {
    NotStarted,
    AwaitingUserMove,
    ComputerThinking,
    ShowingExplanation,
    AwaitingChoice,
    Completed,
    Failed,
}

impl LessonPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, LessonPhase::Completed | LessonPhase::Failed)
    }
}

/// Drives one learner through one lesson
pub struct LessonMachine {
    lesson: Arc<LessonDefinition>,
    settings: EngineSettings,
    resolver: MoveResolver,
    animator: AnimationOrchestrator,
    observer: Arc<dyn LessonObserver>,
    state: SessionState,
    timer: TimerSlot,
    in_flight: Vec<AnimationHandle>,
    initial_position: Position,
}

impl LessonMachine {
    /// Prepare an attempt at `lesson`
    ///
    /// # Errors
    ///
    /// [`LessonError::InvalidStart`] when the lesson's FEN does not parse.
    pub fn new(
        lesson: Arc<LessonDefinition>,
        settings: EngineSettings,
        surface: Arc<dyn BoardSurface>,
        observer: Arc<dyn LessonObserver>,
    ) -> LessonResult<Self> {
        let initial_position =
            lesson
                .initial_position()
                .map_err(|e| LessonError::InvalidStart {
                    lesson_id: lesson.id.clone(),
                    message: e.to_string(),
                })?;

        let resolver = MoveResolver::new(
            RemapTable::new(settings.move_aliases.clone()).merged(&lesson.move_aliases),
        );
        let scorer = SessionScorer::new(
            lesson.computer_strength,
            lesson.thresholds(settings.scoring),
            lesson.success_criteria,
        );
        let animator = AnimationOrchestrator::new(surface, settings.animation);

        Ok(Self {
            state: SessionState::new(initial_position.clone(), scorer),
            lesson,
            settings,
            resolver,
            animator,
            observer,
            timer: TimerSlot::default(),
            in_flight: Vec::new(),
            initial_position,
        })
    }

    pub fn lesson(&self) -> &LessonDefinition {
        &self.lesson
    }

    pub fn phase(&self) -> LessonPhase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.timer.pending()
    }

    /// Animations of the current step that have not been cleaned up yet
    pub fn in_flight_animations(&self) -> usize {
        self.in_flight.len()
    }

    pub fn summary(&self) -> SessionSummary {
        self.state.scorer.summary()
    }

    /// Renderer payload for the current step
    pub fn view(&self) -> StepView {
        let step = self.lesson.step(self.state.step_index);
        StepView {
            step_index: self.state.step_index,
            total_steps: self.lesson.len(),
            step_id: step.map(|s| s.id.clone()),
            fen: self.state.position.to_fen(),
            arrows: step.map(|s| s.guidance.arrows.clone()).unwrap_or_default(),
            highlights: step
                .map(|s| s.guidance.highlights.clone())
                .unwrap_or_default(),
            tooltip: step.and_then(|s| s.guidance.tooltip.clone()),
            feedback: self.state.last_feedback.clone(),
            interaction_enabled: self.state.phase == LessonPhase::AwaitingUserMove,
            phase: self.state.phase,
        }
    }

    /// Enter the first step
    pub async fn start(&mut self) -> LessonResult<()> {
        self.expect_phase("start", LessonPhase::NotStarted)?;
        info!(
            "[LESSON] Starting '{}' ({} steps, session {})",
            self.lesson.id,
            self.lesson.len(),
            self.state.session_id
        );
        self.enter_step(0).await;
        Ok(())
    }

    /// Judge a learner's move on a user-move step
    pub async fn submit_move(&mut self, attempt: MoveDescriptor) -> LessonResult<MoveOutcome> {
        self.expect_phase("submit a move", LessonPhase::AwaitingUserMove)?;

        let lesson = Arc::clone(&self.lesson);
        let index = self.state.step_index;
        let Some(step) = lesson.step(index) else {
            return Err(self.wrong_phase("submit a move"));
        };

        let verdict = classify(&attempt, step, &self.state.position);
        debug!("[LESSON] {} on step '{}': {:?}", attempt, step.id, verdict);

        let outcome = match verdict {
            Verdict::Allowed(desc) => match self.state.position.apply_move(&desc) {
                Ok((next, result)) => {
                    self.state.position = next;
                    self.state.scorer.record_move(true);
                    self.state.last_feedback = None;

                    let outcome = MoveOutcome::Accepted {
                        san: result.san.clone(),
                        uci: result.uci.clone(),
                    };
                    self.observer.on_move_feedback(&outcome);
                    info!("[LESSON] Correct move {} on step '{}'", result.san, step.id);

                    let handles = vec![
                        self.animator.play_move(&result),
                        self.animator.play_feedback(true, result.to),
                    ];
                    self.settle_animations(handles).await;
                    self.advance_from(step).await;
                    return Ok(outcome);
                }
                Err(RulesError::IllegalMove { .. }) => MoveOutcome::Blocked {
                    message: ILLEGAL_MESSAGE.to_string(),
                },
                Err(e) => {
                    warn!("[LESSON] Rules adapter rejected {}: {}", desc, e);
                    MoveOutcome::Blocked {
                        message: ILLEGAL_MESSAGE.to_string(),
                    }
                }
            },
            Verdict::Hint => MoveOutcome::Hint {
                message: step_hint(step).unwrap_or(HINT_MESSAGE).to_string(),
            },
            Verdict::WrongPiece => MoveOutcome::WrongPiece {
                message: WRONG_PIECE_MESSAGE.to_string(),
            },
            Verdict::Blocked => MoveOutcome::Blocked {
                message: BLOCKED_MESSAGE.to_string(),
            },
        };

        self.state.scorer.record_move(false);
        self.state.last_feedback = outcome.message().map(str::to_string);
        self.observer.on_move_feedback(&outcome);
        info!(
            "[LESSON] Mistake on step '{}' ({} so far): {:?}",
            step.id,
            self.state.scorer.mistakes(),
            outcome
        );

        self.prune_animations();
        let feedback = self.animator.play_feedback(false, attempt.from);
        self.in_flight.push(feedback);
        self.render();

        Ok(outcome)
    }

    /// Leave an explanation step
    pub async fn advance(&mut self) -> LessonResult<()> {
        self.expect_phase("advance", LessonPhase::ShowingExplanation)?;
        let lesson = Arc::clone(&self.lesson);
        if let Some(step) = lesson.step(self.state.step_index) {
            self.advance_from(step).await;
        }
        Ok(())
    }

    /// Follow option `index` of the current choice step
    ///
    /// # Errors
    ///
    /// - [`LessonError::InvalidChoice`] for an index outside the option list;
    ///   nothing changes
    /// - [`LessonError::UnknownChoiceTarget`] when the option names a missing
    ///   step; the lesson has failed by the time this is returned
    pub async fn select_choice(&mut self, index: usize) -> LessonResult<()> {
        self.expect_phase("select a choice", LessonPhase::AwaitingChoice)?;

        let lesson = Arc::clone(&self.lesson);
        let Some(step) = lesson.step(self.state.step_index) else {
            return Err(self.wrong_phase("select a choice"));
        };
        let StepAction::Choice { choices, .. } = &step.action else {
            return Err(self.wrong_phase("select a choice"));
        };

        let option = choices.get(index).ok_or_else(|| LessonError::InvalidChoice {
            step_id: step.id.clone(),
            index,
            available: choices.len(),
        })?;

        let Some(target) = lesson.index_of(&option.next_step_id) else {
            let err = LessonError::UnknownChoiceTarget {
                step_id: step.id.clone(),
                choice: option.text.clone(),
                target: option.next_step_id.clone(),
            };
            self.fail(&err);
            return Err(err);
        };

        info!(
            "[LESSON] Choice '{}' on step '{}' -> '{}'",
            option.text, step.id, option.next_step_id
        );
        self.exit_step();
        self.state.last_feedback = option.explanation.clone();
        self.enter_step(target).await;
        Ok(())
    }

    /// Wait for the pending step timer
    ///
    /// Never resolves while no timer is armed.
    pub async fn next_timeout(&mut self) -> TimerHandle {
        self.timer.expired().await
    }

    /// React to an expired step timer
    ///
    /// A timer that no longer matches the current step is ignored.
    pub async fn handle_timeout(&mut self, handle: TimerHandle) {
        let current = self.state.step_index;
        let phase = self.state.phase;
        if handle.step_index != current
            || !matches!(
                phase,
                LessonPhase::ShowingExplanation | LessonPhase::AwaitingChoice
            )
        {
            debug!(
                "[LESSON] Ignoring stale timer #{} for step {} (now step {}, {:?})",
                handle.id, handle.step_index, current, phase
            );
            return;
        }

        info!(
            "[LESSON] Step {} timed out after {:?}",
            current, handle.duration
        );
        let lesson = Arc::clone(&self.lesson);
        if let Some(step) = lesson.step(current) {
            // A choice that times out takes no branch
            self.advance_from(step).await;
        }
    }

    /// Start over from the first step with fresh counters
    pub async fn restart(&mut self) {
        info!("[LESSON] Restarting '{}'", self.lesson.id);
        self.exit_step();
        self.state = self.state.restarted(self.initial_position.clone());
        self.enter_step(0).await;
    }

    /// Stop the attempt for good
    pub fn abandon(&mut self) {
        if self.state.phase.is_finished() {
            return;
        }
        info!("[LESSON] Abandoned '{}' at step {}", self.lesson.id, self.state.step_index);
        self.exit_step();
        self.state.phase = LessonPhase::Failed;
        self.observer.on_session_summary(&self.state.scorer.summary());
        self.observer.on_lesson_failed("lesson abandoned");
    }

    /// Enter `index`, running through computer steps until the lesson waits
    /// for the learner, completes, or fails
    async fn enter_step(&mut self, mut index: usize) {
        let lesson = Arc::clone(&self.lesson);
        let mut hops = 0;

        loop {
            let Some(step) = lesson.step(index) else {
                self.complete();
                return;
            };

            hops += 1;
            if hops > lesson.len() {
                self.fail(&LessonError::EndlessLoop {
                    step_id: step.id.clone(),
                });
                return;
            }

            self.state.step_index = index;
            self.observer.on_step_changed(index, lesson.len());
            debug!("[LESSON] Entering step '{}' ({:?})", step.id, step.kind());

            match &step.action {
                StepAction::UserMove { .. } => {
                    self.state.phase = LessonPhase::AwaitingUserMove;
                    self.render();
                    return;
                }
                StepAction::ComputerMove { computer_move } => {
                    self.play_computer_step(step, computer_move).await;
                }
                StepAction::Explanation { .. } => {
                    self.state.phase = LessonPhase::ShowingExplanation;
                    let explanation = self.animator.play_explanation(
                        &step.guidance.highlight_squares(),
                        &step.guidance.arrow_pairs(),
                    );
                    self.in_flight.push(explanation);
                    self.arm_timer(step);
                    self.render();
                    return;
                }
                StepAction::Choice { .. } => {
                    self.state.phase = LessonPhase::AwaitingChoice;
                    self.arm_timer(step);
                    self.render();
                    return;
                }
            }

            match self.next_index(step) {
                Ok(next) => {
                    // Choice explanations stay up until a step waits for input
                    let carried = self.state.last_feedback.take();
                    self.exit_step();
                    self.state.last_feedback = carried;
                    index = next;
                }
                Err(e) => {
                    self.fail(&e);
                    return;
                }
            }
        }
    }

    async fn play_computer_step(&mut self, step: &Step, scripted: &str) {
        self.state.phase = LessonPhase::ComputerThinking;
        self.render();

        let think = self.settings.computer_think();
        if !think.is_zero() {
            sleep(think).await;
        }

        let report = match self.resolver.resolve(scripted, &self.state.position) {
            Ok(resolved) => {
                self.state.position = resolved.position;
                Some(ComputerMoveReport {
                    authored: scripted.to_string(),
                    result: resolved.result,
                    interpretation: Some(resolved.interpretation),
                })
            }
            Err(e) => {
                warn!("[LESSON] {} on step '{}'", e, step.id);
                match recovery_move(&self.state.position) {
                    Some((next, result)) => {
                        warn!("[LESSON] Playing recovery move {} instead", result.san);
                        self.state.position = next;
                        Some(ComputerMoveReport {
                            authored: scripted.to_string(),
                            result,
                            interpretation: None,
                        })
                    }
                    None => {
                        warn!("[LESSON] No legal move available; skipping step '{}'", step.id);
                        None
                    }
                }
            }
        };

        if let Some(report) = report {
            let handles = vec![
                self.animator.play_move(&report.result),
                self.animator.play_explanation(
                    &step.guidance.highlight_squares(),
                    &step.guidance.arrow_pairs(),
                ),
            ];
            self.state.last_computer_move = Some(report);
            self.render();
            self.settle_animations(handles).await;
        }
    }

    /// Leave `step` for its successor
    async fn advance_from(&mut self, step: &Step) {
        match self.next_index(step) {
            Ok(next) => {
                self.exit_step();
                self.enter_step(next).await;
            }
            Err(e) => self.fail(&e),
        }
    }

    /// Successor of `step`: its `nextStepId`, or the following step
    fn next_index(&self, step: &Step) -> LessonResult<usize> {
        match &step.next_step_id {
            Some(target) => {
                self.lesson
                    .index_of(target)
                    .ok_or_else(|| LessonError::UnknownStepTarget {
                        step_id: step.id.clone(),
                        target: target.clone(),
                    })
            }
            None => Ok(self.state.step_index + 1),
        }
    }

    /// Cancel everything the current step started
    fn exit_step(&mut self) {
        if let Some(timer) = self.timer.cancel() {
            debug!("[LESSON] Cancelled timer #{}", timer.id);
        }
        for mut handle in self.in_flight.drain(..) {
            handle.cancel();
        }
        self.state.last_feedback = None;
    }

    fn arm_timer(&mut self, step: &Step) {
        if let Some(limit) = step.time_limit() {
            let handle = self.timer.arm(self.state.step_index, limit);
            debug!(
                "[LESSON] Armed timer #{} ({:?}) for step '{}'",
                handle.id, limit, step.id
            );
        }
    }

    /// Wait for `handles` to finish, but no longer than the grace window
    ///
    /// Whatever is still running stays in flight until the step is left.
    async fn settle_animations(&mut self, mut handles: Vec<AnimationHandle>) {
        let grace = self.settings.feedback_grace();
        let waited = timeout(grace, async {
            for handle in handles.iter_mut() {
                handle.wait().await;
            }
        })
        .await;

        if waited.is_err() {
            debug!("[LESSON] Animations still running after {:?}; moving on", grace);
        }
        self.in_flight.extend(handles);
    }

    fn prune_animations(&mut self) {
        self.in_flight.retain_mut(|handle| !handle.is_resolved());
    }

    fn complete(&mut self) {
        self.exit_step();
        self.state.phase = LessonPhase::Completed;
        let summary = self.state.scorer.summary();
        info!(
            "[LESSON] Completed '{}': {} correct, {} mistakes",
            self.lesson.id, summary.correct_moves, summary.mistakes
        );
        self.render();
        self.observer.on_session_summary(&summary);
        self.observer.on_lesson_completed();
    }

    fn fail(&mut self, error: &LessonError) {
        warn!("[LESSON] '{}' failed: {}", self.lesson.id, error);
        self.exit_step();
        self.state.phase = LessonPhase::Failed;
        let reason = error.to_string();
        self.state.last_feedback = Some(reason.clone());
        self.render();
        self.observer.on_lesson_failed(&reason);
    }

    fn render(&self) {
        self.observer.on_render(&self.view());
    }

    fn expect_phase(&self, operation: &'static str, phase: LessonPhase) -> LessonResult<()> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(self.wrong_phase(operation))
        }
    }

    fn wrong_phase(&self, operation: &'static str) -> LessonError {
        LessonError::WrongPhase {
            operation,
            phase: self.state.phase,
        }
    }
}

fn step_hint(step: &Step) -> Option<&str> {
    match &step.action {
        StepAction::UserMove { hint, .. } => hint.as_deref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::events::{ChannelObserver, LessonEvent};
    use crate::rendering::surface::RecordingSurface;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    const LESSON: &str = r#"{
        "id": "center",
        "title": "Center",
        "steps": [
            { "id": "push", "kind": "user-move", "allowedMoves": ["e2e4", "d2d4"],
              "hint": "Push a center pawn two squares" },
            { "id": "reply", "kind": "computer-move", "computerMove": "e5" },
            { "id": "why", "kind": "explanation", "text": "Both sides claim the center",
              "highlights": ["e4", "e5"], "timeLimitSeconds": 5 },
            { "id": "develop", "kind": "user-move" }
        ]
    }"#;

    fn machine(json: &str) -> (LessonMachine, UnboundedReceiver<LessonEvent>) {
        machine_on(json, RecordingSurface::new())
    }

    fn machine_on(
        json: &str,
        surface: RecordingSurface,
    ) -> (LessonMachine, UnboundedReceiver<LessonEvent>) {
        let lesson = Arc::new(LessonDefinition::from_json(json).unwrap());
        let (observer, rx) = ChannelObserver::channel();
        let machine = LessonMachine::new(
            lesson,
            EngineSettings::default(),
            Arc::new(surface),
            Arc::new(observer),
        )
        .unwrap();
        (machine, rx)
    }

    fn mv(text: &str) -> MoveDescriptor {
        MoveDescriptor::parse_coordinate(text).unwrap()
    }

    fn drain(rx: &mut UnboundedReceiver<LessonEvent>) -> Vec<LessonEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_waits_for_first_move() {
        let (mut m, mut rx) = machine(LESSON);
        assert_eq!(m.phase(), LessonPhase::NotStarted);

        m.start().await.unwrap();
        assert_eq!(m.phase(), LessonPhase::AwaitingUserMove);
        assert!(m.view().interaction_enabled);

        let events = drain(&mut rx);
        assert_eq!(events[0], LessonEvent::StepChanged { index: 0, total: 4 });
        assert!(matches!(m.start().await, Err(LessonError::WrongPhase { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mistakes_keep_the_step() {
        let (mut m, _rx) = machine(LESSON);
        m.start().await.unwrap();

        let outcome = m.submit_move(mv("g1f3")).await.unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::WrongPiece {
                message: WRONG_PIECE_MESSAGE.to_string()
            }
        );

        let outcome = m.submit_move(mv("e2e3")).await.unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Hint {
                message: "Push a center pawn two squares".to_string()
            }
        );

        assert_eq!(m.state().step_index, 0);
        assert_eq!(m.state().scorer.mistakes(), 2);
        assert_eq!(m.state().position, Position::starting());
        assert_eq!(
            m.view().feedback.as_deref(),
            Some("Push a center pawn two squares")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_correct_move_runs_computer_reply() {
        let (mut m, _rx) = machine(LESSON);
        m.start().await.unwrap();

        let outcome = m.submit_move(mv("e2e4")).await.unwrap();
        assert!(outcome.is_accepted());

        assert_eq!(m.phase(), LessonPhase::ShowingExplanation);
        assert_eq!(m.state().step_index, 2);
        assert_eq!(
            m.state().position.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2"
        );
        let report = m.state().last_computer_move.as_ref().unwrap();
        assert!(!report.recovered());
        assert_eq!(report.result.san, "e5");
        assert!(m.pending_timer().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_advances_exactly_once() {
        let (mut m, _rx) = machine(LESSON);
        m.start().await.unwrap();
        m.submit_move(mv("d2d4")).await.unwrap();

        let handle = m.next_timeout().await;
        assert_eq!(handle.duration, Duration::from_secs(5));
        m.handle_timeout(handle).await;
        assert_eq!(m.state().step_index, 3);
        assert!(m.pending_timer().is_none());

        // Replaying the stale handle changes nothing
        m.handle_timeout(handle).await;
        assert_eq!(m.state().step_index, 3);
        assert_eq!(m.phase(), LessonPhase::AwaitingUserMove);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_advance_cancels_timer() {
        let (mut m, _rx) = machine(LESSON);
        m.start().await.unwrap();
        m.submit_move(mv("e2e4")).await.unwrap();

        m.advance().await.unwrap();
        assert_eq!(m.state().step_index, 3);
        assert!(m.pending_timer().is_none());
        assert!(tokio::time::timeout(Duration::from_secs(30), m.next_timeout())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrestricted_step_then_complete() {
        let (mut m, mut rx) = machine(LESSON);
        m.start().await.unwrap();
        m.submit_move(mv("e2e4")).await.unwrap();
        m.advance().await.unwrap();
        drain(&mut rx);

        m.submit_move(mv("g1f3")).await.unwrap();
        assert_eq!(m.phase(), LessonPhase::Completed);

        let events = drain(&mut rx);
        assert!(events.contains(&LessonEvent::Completed));
        let summary = events.iter().find_map(|e| match e {
            LessonEvent::Summary(s) => Some(s.clone()),
            _ => None,
        });
        let summary = summary.unwrap();
        assert_eq!(summary.correct_moves, 2);
        assert_eq!(summary.mistakes, 0);
        assert!(summary.passed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_illegal_unrestricted_move_is_blocked() {
        let (mut m, _rx) = machine(LESSON);
        m.start().await.unwrap();
        m.submit_move(mv("e2e4")).await.unwrap();
        m.advance().await.unwrap();

        let outcome = m.submit_move(mv("e1e3")).await.unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Blocked {
                message: ILLEGAL_MESSAGE.to_string()
            }
        );
        assert_eq!(m.phase(), LessonPhase::AwaitingUserMove);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolvable_reply_plays_recovery_move() {
        let (mut m, _rx) = machine(
            r#"{ "id": "bad", "title": "Bad", "steps": [
                { "id": "push", "kind": "user-move", "allowedMoves": ["e2e4"] },
                { "id": "reply", "kind": "computer-move", "computerMove": "Qh4" },
                { "id": "next", "kind": "user-move" }
            ] }"#,
        );
        m.start().await.unwrap();
        m.submit_move(mv("e2e4")).await.unwrap();

        assert_eq!(m.state().step_index, 2);
        let report = m.state().last_computer_move.as_ref().unwrap();
        assert!(report.recovered());
        assert_eq!(report.authored, "Qh4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_choice_branches_and_fails_on_unknown_target() {
        let json = r#"{ "id": "branch", "title": "Branch", "steps": [
            { "id": "pick", "kind": "choice", "choices": [
                { "text": "Good", "nextStepId": "good", "explanation": "Nice pick" },
                { "text": "Broken", "nextStepId": "nowhere" } ] },
            { "id": "skipped", "kind": "explanation" },
            { "id": "good", "kind": "explanation" }
        ] }"#;

        let (mut good, _rx) = machine(json);
        good.start().await.unwrap();
        assert!(matches!(
            good.select_choice(7).await,
            Err(LessonError::InvalidChoice { available: 2, .. })
        ));
        assert_eq!(good.phase(), LessonPhase::AwaitingChoice);

        good.select_choice(0).await.unwrap();
        assert_eq!(good.state().step_index, 2);
        assert_eq!(good.view().feedback.as_deref(), Some("Nice pick"));

        let (mut broken, mut rx) = machine(json);
        broken.start().await.unwrap();
        let err = broken.select_choice(1).await.unwrap_err();
        assert!(matches!(err, LessonError::UnknownChoiceTarget { .. }));
        assert_eq!(broken.phase(), LessonPhase::Failed);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, LessonEvent::Failed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_choice_explanation_survives_computer_reply() {
        let (mut m, _rx) = machine(
            r#"{ "id": "reply", "title": "Reply", "steps": [
                { "id": "pick", "kind": "choice", "choices": [
                    { "text": "King's pawn", "nextStepId": "push", "explanation": "Straight to the center" } ] },
                { "id": "push", "kind": "computer-move", "computerMove": "e4" },
                { "id": "answer", "kind": "user-move" }
            ] }"#,
        );
        m.start().await.unwrap();
        m.select_choice(0).await.unwrap();

        assert_eq!(m.phase(), LessonPhase::AwaitingUserMove);
        assert_eq!(m.state().step_index, 2);
        assert_eq!(m.view().feedback.as_deref(), Some("Straight to the center"));

        m.submit_move(mv("e7e5")).await.unwrap();
        assert_eq!(m.phase(), LessonPhase::Completed);
        assert_eq!(m.view().feedback, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_surface_never_blocks_the_lesson() {
        let (mut m, mut rx) = machine_on(LESSON, RecordingSurface::failing());
        m.start().await.unwrap();

        assert!(m.submit_move(mv("g1f3")).await.unwrap().is_mistake());
        assert!(m.submit_move(mv("d2d4")).await.unwrap().is_accepted());
        assert_eq!(m.phase(), LessonPhase::ShowingExplanation);

        let expired = m.next_timeout().await;
        m.handle_timeout(expired).await;
        assert!(m.submit_move(mv("g1f3")).await.unwrap().is_accepted());

        assert_eq!(m.phase(), LessonPhase::Completed);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, LessonEvent::Completed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_session() {
        let (mut m, _rx) = machine(LESSON);
        m.start().await.unwrap();
        m.submit_move(mv("g1f3")).await.unwrap();
        m.submit_move(mv("e2e4")).await.unwrap();
        assert!(m.pending_timer().is_some());
        assert!(m.in_flight_animations() > 0, "explanation overlay is running");
        let first_session = m.state().session_id;

        m.restart().await;
        assert_eq!(m.in_flight_animations(), 0);
        assert_eq!(m.state().step_index, 0);
        assert_eq!(m.state().moves_judged(), 0);
        assert_eq!(m.state().position, Position::starting());
        assert!(m.pending_timer().is_none());
        assert_ne!(m.state().session_id, first_session);
        assert_eq!(m.phase(), LessonPhase::AwaitingUserMove);
    }

    #[tokio::test(start_paused = true)]
    async fn test_computer_loop_is_detected() {
        let (mut m, _rx) = machine(
            r#"{ "id": "loop", "title": "Loop", "initialFen": "4k3/8/8/8/8/8/8/R3K3 w - - 0 1",
                 "steps": [
                { "id": "a", "kind": "computer-move", "computerMove": "Ra2", "nextStepId": "b" },
                { "id": "b", "kind": "computer-move", "computerMove": "Kd7", "nextStepId": "a" }
            ] }"#,
        );
        m.start().await.unwrap();
        assert_eq!(m.phase(), LessonPhase::Failed);
    }
}
