//! Command-line entry points.

pub mod analyze;
pub mod invoke;
pub mod run;

pub use analyze::AnalyzeArgs;
pub use invoke::InvokeArgs;
use thiserror::Error;

use crate::{
    context::AppContextError,
    engine::{AnalyzerError, DirectoryError},
    supervisor::SupervisorError,
};

/// Errors surfaced by the subcommands.
#[derive(Error, Debug)]
pub enum Error {
    /// The application could not be wired.
    #[error("Initialization error: {0}")]
    Context(#[from] AppContextError),
    /// The supervisor could not start.
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),
    /// Job addresses could not be resolved.
    #[error("Job directory error: {0}")]
    Directory(#[from] DirectoryError),
    /// The activity analysis failed.
    #[error("Analysis error: {0}")]
    Analyzer(#[from] AnalyzerError),
    /// The invocation event or the output could not be (de)serialized.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
