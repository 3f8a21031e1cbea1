//! # Runtime events emitted by the dispatch loop.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Job lifecycle**: launch, completion, nonzero exit, signal, anomaly
//! - **Source conditions**: irrecoverable read failure, truncated trailing line
//! - **Delivery diagnostics**: subscriber overflow / panic
//!
//! The [`Event`] struct carries the metadata each kind needs: the job sequence
//! number, the command text, the OS process id, the exit code or signal, and a
//! human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use parrun::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::JobStarted)
//!     .with_job(3)
//!     .with_command("sleep 1")
//!     .with_pid(4242);
//!
//! assert_eq!(ev.kind, EventKind::JobStarted);
//! assert_eq!(ev.command.as_deref(), Some("sleep 1"));
//! assert_eq!(ev.pid, Some(4242));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Job lifecycle events ===
    /// A job's process was started.
    ///
    /// Sets:
    /// - `job`: launch sequence number (1-based)
    /// - `command`: the trimmed command line
    /// - `pid`: OS process id
    JobStarted,

    /// A job's process exited with status zero.
    ///
    /// Sets:
    /// - `pid`: OS process id
    JobCompleted,

    /// A job's process exited with a nonzero status.
    ///
    /// Sets:
    /// - `pid`: OS process id
    /// - `code`: the nonzero exit code
    JobFailed,

    /// A job's process was terminated by a signal.
    ///
    /// Sets:
    /// - `pid`: OS process id
    /// - `signal`: the signal number
    JobSignaled,

    /// A job's process finished in an unrecognized way.
    ///
    /// Sets:
    /// - `pid`: OS process id
    JobDied,

    /// Starting a process for a command failed; the command is skipped.
    ///
    /// Sets:
    /// - `job`: launch sequence number the attempt consumed
    /// - `command`: the trimmed command line
    /// - `reason`: the spawn error
    LaunchFailed,

    // === Source conditions ===
    /// Reading from the command source failed irrecoverably; no further
    /// lines will be yielded. Published at most once per run.
    ///
    /// Sets:
    /// - `reason`: the read error
    SourceReadFailed,

    /// The command source ended with a line that never received a
    /// terminating newline. Advisory; that line was not launched.
    ///
    /// Sets:
    /// - `reason`: fixed warning text
    SourceTruncated,

    // === Delivery diagnostics ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

/// Reporting level of an event, mirroring the classic message/warning/error
/// log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress information, normally only shown in verbose mode.
    Info,
    /// Something the user should probably see, run continues unaffected.
    Warning,
    /// A recoverable error the user should know about.
    Error,
}

impl EventKind {
    /// Maps the event kind to its reporting level.
    pub fn severity(self) -> Severity {
        match self {
            EventKind::JobStarted | EventKind::JobCompleted => Severity::Info,
            EventKind::JobFailed
            | EventKind::JobSignaled
            | EventKind::JobDied
            | EventKind::SubscriberOverflow
            | EventKind::SubscriberPanicked => Severity::Warning,
            EventKind::LaunchFailed
            | EventKind::SourceReadFailed
            | EventKind::SourceTruncated => Severity::Error,
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Launch sequence number of the job, if applicable (1-based).
    pub job: Option<u64>,
    /// OS process id, if a process was started.
    pub pid: Option<u32>,
    /// The trimmed command line, if applicable.
    pub command: Option<Arc<str>>,
    /// Exit code for a normal nonzero exit.
    pub code: Option<i32>,
    /// Signal number for a signal-terminated process.
    pub signal: Option<i32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            pid: None,
            command: None,
            code: None,
            signal: None,
            reason: None,
        }
    }

    /// Attaches a job launch sequence number.
    #[inline]
    pub fn with_job(mut self, job: u64) -> Self {
        self.job = Some(job);
        self
    }

    /// Attaches an OS process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches the command line text.
    #[inline]
    pub fn with_command(mut self, command: impl Into<Arc<str>>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches a signal number.
    #[inline]
    pub fn with_signal(mut self, signal: i32) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::JobStarted);
        let b = Event::new(EventKind::JobCompleted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::JobFailed)
            .with_job(7)
            .with_pid(123)
            .with_command("false")
            .with_code(1)
            .with_reason("boom");
        assert_eq!(ev.job, Some(7));
        assert_eq!(ev.pid, Some(123));
        assert_eq!(ev.command.as_deref(), Some("false"));
        assert_eq!(ev.code, Some(1));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        assert_eq!(ev.signal, None);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(EventKind::JobStarted.severity(), Severity::Info);
        assert_eq!(EventKind::JobCompleted.severity(), Severity::Info);
        assert_eq!(EventKind::JobFailed.severity(), Severity::Warning);
        assert_eq!(EventKind::LaunchFailed.severity(), Severity::Error);
        assert_eq!(EventKind::SourceTruncated.severity(), Severity::Error);
    }
}
