//! Lesson Runner
//!
//! Headless front end for the lesson engine: plays a lesson from the command
//! line with scripted moves and choices, or lints lesson files.
//!
//! ```text
//! lesson-runner play lessons/open-center.json --moves e2e4,g1f3 --choose 0
//! lesson-runner check lessons/
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use xfchess_lessons::core::settings::{load_settings_from, settings_path};
use xfchess_lessons::core::logging::with_bootstrap_logging;
use xfchess_lessons::core::{init_tracing, EngineSettings};
use xfchess_lessons::lesson::{
    lint, load_lesson, LessonLibrary, LessonMachine, LessonPhase, TracingObserver,
};
use xfchess_lessons::rendering::LogSurface;
use xfchess_lessons::rules::MoveDescriptor;

/// Headless runner for XFChess guided practice lessons
#[derive(Parser, Debug)]
#[command(name = "lesson-runner", version)]
struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a lesson with scripted input and print the session summary
    Play {
        /// Lesson JSON file
        lesson: PathBuf,

        /// Learner moves in coordinate notation, in order
        #[arg(long, value_delimiter = ',')]
        moves: Vec<String>,

        /// Option indices for choice steps, in order
        #[arg(long, value_delimiter = ',')]
        choose: Vec<usize>,

        /// Let timed steps run out instead of advancing them at once
        #[arg(long)]
        wait_timers: bool,
    },
    /// Check lesson files (or directories of them) for authoring mistakes
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let path = args.settings.clone().unwrap_or_else(settings_path);
    let settings = with_bootstrap_logging(|| load_settings_from(&path));
    init_tracing(&settings.log_filter);

    match args.command {
        Command::Play {
            lesson,
            moves,
            choose,
            wait_timers,
        } => play(&lesson, settings, moves, choose, wait_timers).await,
        Command::Check { paths } => check(&paths, &settings),
    }
}

async fn play(
    path: &Path,
    settings: EngineSettings,
    moves: Vec<String>,
    choose: Vec<usize>,
    wait_timers: bool,
) -> Result<()> {
    let lesson = load_lesson(path).with_context(|| format!("loading {}", path.display()))?;
    println!("Lesson: {} ({} steps)", lesson.title, lesson.len());

    let mut moves = moves
        .iter()
        .map(|m| MoveDescriptor::parse_coordinate(m).with_context(|| format!("move '{m}'")))
        .collect::<Result<VecDeque<_>>>()?;
    let mut choices: VecDeque<usize> = choose.into();

    let mut machine = LessonMachine::new(
        Arc::new(lesson),
        settings,
        Arc::new(LogSurface),
        Arc::new(TracingObserver),
    )?;
    machine.start().await?;

    loop {
        let view = machine.view();
        println!(
            "[{}/{}] {:?} {}",
            view.step_index + 1,
            view.total_steps,
            view.phase,
            view.fen
        );
        if let Some(tooltip) = &view.tooltip {
            println!("      {tooltip}");
        }

        match machine.phase() {
            LessonPhase::AwaitingUserMove => {
                let Some(attempt) = moves.pop_front() else {
                    println!("Out of scripted moves; stopping.");
                    break;
                };
                let outcome = machine.submit_move(attempt).await?;
                println!("  {attempt} -> {outcome:?}");
            }
            LessonPhase::ShowingExplanation => {
                if wait_timers && machine.pending_timer().is_some() {
                    let expired = machine.next_timeout().await;
                    machine.handle_timeout(expired).await;
                } else {
                    machine.advance().await?;
                }
            }
            LessonPhase::AwaitingChoice => match choices.pop_front() {
                Some(index) => machine.select_choice(index).await?,
                None if wait_timers && machine.pending_timer().is_some() => {
                    let expired = machine.next_timeout().await;
                    machine.handle_timeout(expired).await;
                }
                None => {
                    println!("Out of scripted choices; stopping.");
                    break;
                }
            },
            LessonPhase::Completed | LessonPhase::Failed => break,
            LessonPhase::NotStarted | LessonPhase::ComputerThinking => {
                bail!("lesson stalled in {:?}", machine.phase())
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&machine.summary())?);
    if machine.phase() == LessonPhase::Failed {
        bail!(
            "lesson failed: {}",
            machine.view().feedback.unwrap_or_default()
        );
    }
    Ok(())
}

fn check(paths: &[PathBuf], settings: &EngineSettings) -> Result<()> {
    let mut lessons = Vec::new();
    for path in paths {
        if path.is_dir() {
            let library = LessonLibrary::load_dir(path)?;
            lessons.extend(library.ids().filter_map(|id| library.get(id)));
        } else {
            let lesson = load_lesson(path).with_context(|| format!("loading {}", path.display()))?;
            lessons.push(Arc::new(lesson));
        }
    }

    let mut problems = 0;
    for lesson in &lessons {
        let issues = lint(lesson, &settings.move_aliases);
        if issues.is_empty() {
            println!("ok    {}", lesson.id);
            continue;
        }
        problems += issues.len();
        println!("FAIL  {}", lesson.id);
        for issue in issues {
            println!("      {issue}");
        }
    }

    if problems > 0 {
        bail!("{problems} problem(s) in {} lesson(s)", lessons.len());
    }
    Ok(())
}
