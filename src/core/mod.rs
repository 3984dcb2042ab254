//! Core module - application infrastructure shared by the lesson engine
//!
//! # Contents
//!
//! - [`settings`] - [`EngineSettings`] and its JSON persistence
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - [`CoreError`] for I/O and content loading

pub mod error;
pub mod logging;
pub mod settings;

pub use error::{CoreError, CoreResult};
pub use logging::init_tracing;
pub use settings::{load_settings, save_settings, EngineSettings};
