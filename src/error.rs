//! Error types used by the parrun runtime.
//!
//! Only one condition is fatal to a whole run: failing to open the command
//! source before any job has been launched. Every other failure mode in the
//! system (an irrecoverable read mid-run, a process that cannot be started, a
//! truncated trailing line, a child that dies in an unrecognized way) is
//! absorbed locally and surfaced through the event channel instead of an
//! error return — see [`EventKind`](crate::events::EventKind).

use std::io;

use thiserror::Error;

/// # Fatal errors produced by the parrun runtime.
///
/// Returned from entry points that must succeed for a run to start at all.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The command file could not be opened; nothing has been launched yet.
    #[error("cannot open command file \"{path}\": {source}")]
    Open {
        /// Path that was passed on the command line.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl RunnerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use parrun::RunnerError;
    /// use std::io;
    ///
    /// let err = RunnerError::Open {
    ///     path: "jobs.txt".into(),
    ///     source: io::Error::from(io::ErrorKind::NotFound),
    /// };
    /// assert_eq!(err.as_label(), "runner_open_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerError::Open { .. } => "runner_open_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RunnerError::Open { path, source } => {
                format!("cannot open command file \"{path}\": {source}")
            }
        }
    }
}
