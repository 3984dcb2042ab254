//! Lesson driver - one task, one transition at a time
//!
//! [`LessonDriver`] owns a [`LessonMachine`] and races host commands against
//! the machine's pending step timer in a `tokio::select!` loop. Whichever
//! fires first is handled to completion before the next is looked at, so a
//! timer can never interleave with a half-finished move.
//!
//! Hosts talk to the driver through a cloneable [`LessonHandle`].

use crate::lesson::error::{LessonError, LessonResult};
use crate::lesson::events::MoveOutcome;
use crate::lesson::machine::LessonMachine;
use chess_logic_shared::MoveDescriptor;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Requests a host can make of a running lesson
#[derive(Debug)]
pub enum LessonCommand {
    Start,
    Move {
        attempt: MoveDescriptor,
        reply: Option<oneshot::Sender<LessonResult<MoveOutcome>>>,
    },
    Advance,
    Choose(usize),
    Restart,
    Abandon,
}

/// Sending side of a lesson driver
#[derive(Debug, Clone)]
pub struct LessonHandle {
    tx: mpsc::UnboundedSender<LessonCommand>,
}

impl LessonHandle {
    pub fn send(&self, command: LessonCommand) -> LessonResult<()> {
        self.tx.send(command).map_err(|_| LessonError::DriverStopped)
    }

    pub fn start(&self) -> LessonResult<()> {
        self.send(LessonCommand::Start)
    }

    /// Submit a move and wait for the verdict
    pub async fn submit_move(&self, attempt: MoveDescriptor) -> LessonResult<MoveOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(LessonCommand::Move {
            attempt,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| LessonError::DriverStopped)?
    }

    pub fn advance(&self) -> LessonResult<()> {
        self.send(LessonCommand::Advance)
    }

    pub fn choose(&self, index: usize) -> LessonResult<()> {
        self.send(LessonCommand::Choose(index))
    }

    pub fn restart(&self) -> LessonResult<()> {
        self.send(LessonCommand::Restart)
    }

    pub fn abandon(&self) -> LessonResult<()> {
        self.send(LessonCommand::Abandon)
    }
}

/// Runs a lesson machine on the current task
pub struct LessonDriver {
    machine: LessonMachine,
    commands: mpsc::UnboundedReceiver<LessonCommand>,
}

impl LessonDriver {
    pub fn new(machine: LessonMachine) -> (Self, LessonHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        (Self { machine, commands }, LessonHandle { tx })
    }

    /// Process commands and timer expiries until abandoned or every handle
    /// is dropped, then hand the machine back
    pub async fn run(mut self) -> LessonMachine {
        info!("[LESSON] Driver running for '{}'", self.machine.lesson().id);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("[LESSON] All handles dropped; driver stopping");
                        break;
                    };
                    if !self.handle(command).await {
                        break;
                    }
                }
                expired = self.machine.next_timeout() => {
                    self.machine.handle_timeout(expired).await;
                }
            }
        }

        self.machine
    }

    /// Returns `false` once the lesson is abandoned
    async fn handle(&mut self, command: LessonCommand) -> bool {
        let result = match command {
            LessonCommand::Start => self.machine.start().await,
            LessonCommand::Move { attempt, reply } => {
                let outcome = self.machine.submit_move(attempt).await;
                match reply {
                    Some(reply) => {
                        let _ = reply.send(outcome);
                        Ok(())
                    }
                    None => outcome.map(|_| ()),
                }
            }
            LessonCommand::Advance => self.machine.advance().await,
            LessonCommand::Choose(index) => self.machine.select_choice(index).await,
            LessonCommand::Restart => {
                self.machine.restart().await;
                Ok(())
            }
            LessonCommand::Abandon => {
                self.machine.abandon();
                return false;
            }
        };

        if let Err(e) = result {
            warn!("[LESSON] Command rejected: {}", e);
        }
        true
    }
}
