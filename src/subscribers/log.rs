//! # Stdout/stderr logging subscriber.
//!
//! [`LogWriter`] prints events in a human-readable format: informational
//! progress goes to stdout and only when verbose reporting is enabled,
//! warnings and errors always go to stderr.
//!
//! ## Output format
//! ```text
//! [started] job=3 pid=4242 cmd="sleep 1"
//! [done] pid=4242
//! [exit] pid=4242 code=2
//! [signal] pid=4242 sig=9
//! [died] pid=4242
//! [launch-failed] job=4 cmd="nosuch" err="..."
//! [read-failed] read from command file failed: ...
//! [truncated] incomplete line at the end of command file (ignored)
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind, Severity};
use crate::subscribers::Subscribe;

/// Stdout/stderr logging subscriber.
///
/// `Info` events are suppressed unless constructed with `verbose = true`;
/// `Warning` and `Error` events are always written to stderr.
pub struct LogWriter {
    verbose: bool,
}

impl LogWriter {
    /// Creates a writer; `verbose` enables informational progress output.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        if e.kind.severity() == Severity::Info && !self.verbose {
            return;
        }
        match e.kind {
            EventKind::JobStarted => {
                if let (Some(job), Some(pid), Some(cmd)) = (e.job, e.pid, &e.command) {
                    println!("[started] job={job} pid={pid} cmd={cmd:?}");
                }
            }
            EventKind::JobCompleted => {
                if let Some(pid) = e.pid {
                    println!("[done] pid={pid}");
                }
            }
            EventKind::JobFailed => {
                eprintln!(
                    "[exit] pid={} code={}",
                    e.pid.unwrap_or(0),
                    e.code.unwrap_or(-1)
                );
            }
            EventKind::JobSignaled => {
                eprintln!(
                    "[signal] pid={} sig={}",
                    e.pid.unwrap_or(0),
                    e.signal.unwrap_or(-1)
                );
            }
            EventKind::JobDied => {
                eprintln!("[died] pid={}", e.pid.unwrap_or(0));
            }
            EventKind::LaunchFailed => {
                eprintln!(
                    "[launch-failed] job={} cmd={:?} err={}",
                    e.job.unwrap_or(0),
                    e.command.as_deref().unwrap_or(""),
                    e.reason.as_deref().unwrap_or("unknown")
                );
            }
            EventKind::SourceReadFailed => {
                eprintln!(
                    "[read-failed] {}",
                    e.reason.as_deref().unwrap_or("read from command file failed")
                );
            }
            EventKind::SourceTruncated => {
                eprintln!(
                    "[truncated] {}",
                    e.reason.as_deref().unwrap_or("incomplete line at end of input")
                );
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                eprintln!("[delivery] {}", e.reason.as_deref().unwrap_or("unknown"));
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
