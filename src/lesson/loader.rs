//! Lesson loading and content linting
//!
//! [`load_lesson`] reads one JSON file; [`LessonLibrary::load_dir`] reads every
//! `*.json` file in a directory. [`lint`] checks a lesson for authoring
//! mistakes before anyone plays it: broken branch targets, bad squares, and
//! computer moves that do not resolve on the main line.

use crate::core::error::{CoreError, CoreResult};
use crate::lesson::arbiter::resolve_entries;
use crate::lesson::definition::{LessonDefinition, StepAction};
use crate::lesson::resolver::{MoveResolver, RemapTable};
use chess_logic_shared::{MoveDescriptor, Position, Square};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// An authoring problem found by [`lint`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentIssue {
    #[error("Invalid initial FEN: {message}")]
    InvalidFen { message: String },

    #[error("Duplicate step id '{step_id}'")]
    DuplicateStepId { step_id: String },

    #[error("Choice '{choice}' on step '{step_id}' targets unknown step '{target}'")]
    UnknownChoiceTarget {
        step_id: String,
        choice: String,
        target: String,
    },

    #[error("Step '{step_id}' continues at unknown step '{target}'")]
    UnknownNextStep { step_id: String, target: String },

    #[error("Choice step '{step_id}' offers no options")]
    EmptyChoice { step_id: String },

    #[error("Step '{step_id}' has malformed guidance '{entry}'")]
    InvalidGuidance { step_id: String, entry: String },

    #[error("Step '{step_id}' whitelists '{entry}', which is no move in that position")]
    UnknownAllowedMove { step_id: String, entry: String },

    #[error("Computer move '{text}' on step '{step_id}' does not resolve")]
    UnresolvableComputerMove { step_id: String, text: String },
}

/// Check `lesson` for authoring mistakes
///
/// Move checks follow the main line: every user-move step is played with its
/// first whitelisted move (or skipped when unrestricted, since the position is
/// then unknown from there on) and every computer move is resolved with
/// `aliases`. Branches taken only through choices are checked for targets but
/// not replayed.
pub fn lint(lesson: &LessonDefinition, aliases: &BTreeMap<String, String>) -> Vec<ContentIssue> {
    let mut issues = Vec::new();
    let ids: HashSet<&str> = lesson.steps.iter().map(|s| s.id.as_str()).collect();

    let mut seen = HashSet::new();
    for step in &lesson.steps {
        if !seen.insert(step.id.as_str()) {
            issues.push(ContentIssue::DuplicateStepId {
                step_id: step.id.clone(),
            });
        }

        if let Some(target) = &step.next_step_id {
            if !ids.contains(target.as_str()) {
                issues.push(ContentIssue::UnknownNextStep {
                    step_id: step.id.clone(),
                    target: target.clone(),
                });
            }
        }

        for entry in &step.guidance.highlights {
            if entry.trim().parse::<Square>().is_err() {
                issues.push(ContentIssue::InvalidGuidance {
                    step_id: step.id.clone(),
                    entry: entry.clone(),
                });
            }
        }
        for entry in &step.guidance.arrows {
            if MoveDescriptor::parse_coordinate(entry).is_err() {
                issues.push(ContentIssue::InvalidGuidance {
                    step_id: step.id.clone(),
                    entry: entry.clone(),
                });
            }
        }

        if let StepAction::Choice { choices, .. } = &step.action {
            if choices.is_empty() {
                issues.push(ContentIssue::EmptyChoice {
                    step_id: step.id.clone(),
                });
            }
            for choice in choices {
                if !ids.contains(choice.next_step_id.as_str()) {
                    issues.push(ContentIssue::UnknownChoiceTarget {
                        step_id: step.id.clone(),
                        choice: choice.text.clone(),
                        target: choice.next_step_id.clone(),
                    });
                }
            }
        }
    }

    match lesson.initial_position() {
        Ok(position) => lint_main_line(lesson, aliases, position, &mut issues),
        Err(e) => issues.push(ContentIssue::InvalidFen {
            message: e.to_string(),
        }),
    }

    issues
}

fn lint_main_line(
    lesson: &LessonDefinition,
    aliases: &BTreeMap<String, String>,
    start: Position,
    issues: &mut Vec<ContentIssue>,
) {
    let resolver = MoveResolver::new(RemapTable::new(aliases.clone()).merged(&lesson.move_aliases));
    let mut position = Some(start);

    for step in &lesson.steps {
        let Some(current) = position.take() else {
            break;
        };

        position = match &step.action {
            StepAction::UserMove { allowed_moves, .. } => {
                let entries = allowed_moves.as_deref().unwrap_or_default();
                let resolved = resolve_entries(entries, &current);
                for entry in entries {
                    if resolve_entries(std::slice::from_ref(entry), &current).is_empty() {
                        issues.push(ContentIssue::UnknownAllowedMove {
                            step_id: step.id.clone(),
                            entry: entry.clone(),
                        });
                    }
                }
                resolved
                    .first()
                    .and_then(|desc| current.apply_move(desc).ok())
                    .map(|(next, _)| next)
            }
            StepAction::ComputerMove { computer_move } => {
                match resolver.resolve(computer_move, &current) {
                    Ok(resolved) => Some(resolved.position),
                    Err(_) => {
                        issues.push(ContentIssue::UnresolvableComputerMove {
                            step_id: step.id.clone(),
                            text: computer_move.clone(),
                        });
                        None
                    }
                }
            }
            StepAction::Explanation { .. } | StepAction::Choice { .. } => Some(current),
        };
    }
}

/// Read a lesson from a JSON file
pub fn load_lesson(path: &Path) -> CoreResult<LessonDefinition> {
    let contents = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    LessonDefinition::from_json(&contents)
}

/// Lessons keyed by id
#[derive(Debug, Clone, Default)]
pub struct LessonLibrary {
    lessons: BTreeMap<String, Arc<LessonDefinition>>,
}

impl LessonLibrary {
    /// Load every `*.json` file in `dir`
    ///
    /// Files that fail to load are logged and skipped; a later file with an
    /// id already loaded replaces the earlier one.
    pub fn load_dir(dir: &Path) -> CoreResult<Self> {
        let entries = fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut library = Self::default();
        for path in paths {
            match load_lesson(&path) {
                Ok(lesson) => {
                    info!("[LESSON] Loaded '{}' from {:?}", lesson.id, path);
                    library.insert(lesson);
                }
                Err(e) => warn!("[LESSON] Skipping {:?}: {}", path, e),
            }
        }
        Ok(library)
    }

    pub fn insert(&mut self, lesson: LessonDefinition) {
        if self.lessons.contains_key(&lesson.id) {
            warn!("[LESSON] Duplicate lesson id '{}'; keeping the newer one", lesson.id);
        }
        self.lessons.insert(lesson.id.clone(), Arc::new(lesson));
    }

    pub fn get(&self, id: &str) -> Option<Arc<LessonDefinition>> {
        self.lessons.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.lessons.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}
