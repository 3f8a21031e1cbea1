//! The process execution capability used by the dispatch loop.
//!
//! The loop only needs two primitives: start a child process for a command
//! line, and block until any outstanding child finishes. [`Spawn`] captures
//! exactly that, so the scheduling logic can be tested with a fake that
//! simulates process lifetimes deterministically.
//!
//! - [`shell`]: [`ShellSpawner`], the real implementation over `sh -c`.

mod shell;

use std::fmt;
use std::io;

use async_trait::async_trait;

pub use shell::ShellSpawner;

/// Opaque identifier of a running job's process (the OS pid for the real
/// spawner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(pub u32);

impl JobHandle {
    /// The process id behind this handle.
    #[inline]
    pub fn pid(self) -> u32 {
        self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Termination classification of a reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by the given signal.
    Signaled(i32),
    /// Any other termination shape (including a failed wait).
    Unknown,
}

impl Outcome {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Exited(0) => "job_succeeded",
            Outcome::Exited(_) => "job_failed",
            Outcome::Signaled(_) => "job_signaled",
            Outcome::Unknown => "job_died",
        }
    }
}

/// # Start/wait primitives for job processes.
///
/// Implementations own the set of outstanding children. `start` must not
/// block; `wait_any` is the dispatch loop's sole suspension point.
#[async_trait]
pub trait Spawn: Send {
    /// Starts a child process executing `command` through a command
    /// interpreter and returns its handle.
    ///
    /// A failed start consumes nothing: no handle is tracked and the next
    /// `wait_any` is unaffected.
    fn start(&mut self, command: &str) -> io::Result<JobHandle>;

    /// Waits until any one outstanding child finishes; returns its handle and
    /// termination classification, or `None` if no children are outstanding.
    ///
    /// A handle is returned at most once.
    async fn wait_any(&mut self) -> Option<(JobHandle, Outcome)>;
}
