//! # parrun
//!
//! **parrun** runs shell commands read from a text source — a named file or
//! stdin, one command per line — with at most N of them executing
//! concurrently, and reports every job's outcome through an event fan-out.
//!
//! ## Architecture
//! ```text
//!   command file / stdin
//!           │
//!           ▼
//!   ┌──────────────┐   next_line()   ┌────────────────────────────────┐
//!   │  LineSource  │ ───────────────►│  Dispatcher (fill/drain loop)  │
//!   │ (incremental │                 │  - at most N running           │
//!   │  line reader)│                 │  - FIFO launch, any-order reap │
//!   └──────────────┘                 └──────┬─────────────────┬───────┘
//!                                            │ start/wait_any │ emit(Event)
//!                                            ▼                ▼
//!                                   ┌──────────────┐   ┌───────────────┐
//!                                   │ Spawn        │   │ SubscriberSet │
//!                                   │ (ShellSpawner│   │ (backlog +    │
//!                                   │  over sh -c) │   │  fan-out)     │
//!                                   └──────────────┘   └───┬───────┬───┘
//!                                                          ▼       ▼
//!                                                     LogWriter  custom
//!                                                                sinks
//! ```
//!
//! ## Guarantees
//! - Commands are launched in input order; they complete and are reaped in
//!   whatever order the OS reports.
//! - At every instant, at most `max_concurrent` jobs are running.
//! - Blank lines are skipped and surrounding whitespace is trimmed; a
//!   trailing line without a newline is never launched and is flagged as a
//!   soft warning after the run.
//! - A command whose process cannot be started is reported and skipped; only
//!   failing to open the command source at all aborts a run.
//!
//! ## Example
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use parrun::{Config, Dispatcher, LineSource, LogWriter, ShellSpawner, SubscriberSet};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), parrun::RunnerError> {
//!     let cfg = Config { max_concurrent: 4, verbose: true };
//!
//!     // Two-phase logger init: buffer, attach sinks, mark ready.
//!     let subs = SubscriberSet::buffering();
//!     subs.attach(Arc::new(LogWriter::new(cfg.verbose)));
//!     subs.mark_ready();
//!
//!     let mut source = LineSource::open(Some(Path::new("jobs.txt")))?;
//!     let mut dispatcher =
//!         Dispatcher::new(ShellSpawner::new(), subs.clone(), cfg.concurrency_limit());
//!     let summary = dispatcher.run(&mut source).await;
//!
//!     if source.is_truncated() {
//!         eprintln!("incomplete line at the end of command file (ignored)");
//!     }
//!     subs.shutdown().await;
//!     println!("{} launched, {} completed", summary.launched, summary.completed());
//!     Ok(())
//! }
//! ```

mod config;
mod dispatch;
mod error;
mod events;
mod source;
mod spawn;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use dispatch::{Dispatcher, JobSummary};
pub use error::RunnerError;
pub use events::{Event, EventKind, Severity};
pub use source::{Input, LineSource};
pub use spawn::{JobHandle, Outcome, ShellSpawner, Spawn};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
