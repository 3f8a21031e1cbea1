//! # The bounded-concurrency dispatch loop.
//!
//! [`Dispatcher`] consumes commands from a [`LineSource`], starts processes
//! through a [`Spawn`] implementation, and enforces the invariant "at most
//! `max_concurrent` jobs running" until the input is exhausted and every
//! child has been reaped.
//!
//! ## Loop structure
//! ```text
//! loop {
//!   ├─► fill phase: while running < max_concurrent
//!   │       ├─ next_line() → command?  (None → input done, report read error once)
//!   │       ├─ launched += 1           (sequence number assigned here)
//!   │       ├─ start(command)
//!   │       │     ├─ Ok(handle)  → running += 1, emit JobStarted
//!   │       │     └─ Err(e)      → emit LaunchFailed   (slot stays free)
//!   │
//!   ├─► drain phase:
//!   │       ├─ running == 0 && input done → exit loop
//!   │       └─ wait_any().await          (sole suspension point)
//!   │             ├─ Exited(0)    → emit JobCompleted
//!   │             ├─ Exited(code) → emit JobFailed
//!   │             ├─ Signaled(s)  → emit JobSignaled
//!   │             └─ Unknown      → emit JobDied
//! }
//! ```
//!
//! ## Rules
//! - Commands are **launched** in input order (FIFO); they **complete** in
//!   whatever order the OS reports.
//! - A failed start is non-fatal: it is reported and the slot is refilled
//!   with the next line in the same phase. No retry, at most one attempt per
//!   command.
//! - A job is never reaped twice (guaranteed by the [`Spawn`] contract).

use std::io::Read;

use crate::events::{Event, EventKind};
use crate::source::LineSource;
use crate::spawn::{Outcome, Spawn};
use crate::subscribers::SubscriberSet;

/// Final counts of a run.
///
/// `launched` counts start *attempts* (each consumes a sequence number);
/// launch failures are excluded from the reaped counts and tracked
/// separately.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary {
    /// Start attempts, successful or not.
    pub launched: u64,
    /// Jobs that exited with status zero.
    pub succeeded: u64,
    /// Jobs that exited with a nonzero status.
    pub failed: u64,
    /// Jobs terminated by a signal.
    pub signaled: u64,
    /// Jobs that finished in an unrecognized way.
    pub anomalies: u64,
    /// Commands whose process could not be started.
    pub launch_failures: u64,
}

impl JobSummary {
    /// Jobs actually reaped (launch failures excluded).
    #[inline]
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.signaled + self.anomalies
    }
}

/// Drives the fill/drain loop over a command source and a spawner.
pub struct Dispatcher<S: Spawn> {
    spawner: S,
    subs: SubscriberSet,
    max_concurrent: usize,
}

impl<S: Spawn> Dispatcher<S> {
    /// Creates a dispatcher with the given concurrency limit (clamped to a
    /// minimum of 1).
    pub fn new(spawner: S, subs: SubscriberSet, max_concurrent: usize) -> Self {
        Self {
            spawner,
            subs,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Runs every command the source yields, at most `max_concurrent` at a
    /// time, and returns the final counts.
    ///
    /// Returns only when the source is exhausted and no children remain.
    pub async fn run<R: Read>(&mut self, source: &mut LineSource<R>) -> JobSummary {
        let mut summary = JobSummary::default();
        let mut running: usize = 0;
        let mut input_done = false;

        loop {
            while running < self.max_concurrent && !input_done {
                let Some(command) = source.next_line() else {
                    input_done = true;
                    if let Some(err) = source.take_read_error() {
                        self.subs.emit(
                            Event::new(EventKind::SourceReadFailed)
                                .with_reason(format!("read from command file failed: {err}")),
                        );
                    }
                    break;
                };

                summary.launched += 1;
                let job = summary.launched;
                match self.spawner.start(&command) {
                    Ok(handle) => {
                        running += 1;
                        self.subs.emit(
                            Event::new(EventKind::JobStarted)
                                .with_job(job)
                                .with_pid(handle.pid())
                                .with_command(command),
                        );
                    }
                    Err(err) => {
                        summary.launch_failures += 1;
                        self.subs.emit(
                            Event::new(EventKind::LaunchFailed)
                                .with_job(job)
                                .with_command(command)
                                .with_reason(err.to_string()),
                        );
                    }
                }
            }

            if running == 0 {
                if input_done {
                    break;
                }
                continue;
            }

            let Some((handle, outcome)) = self.spawner.wait_any().await else {
                // The spawner lost track of a child it reported as started.
                break;
            };
            running -= 1;

            match outcome {
                Outcome::Exited(0) => {
                    summary.succeeded += 1;
                    self.subs.emit(
                        Event::new(EventKind::JobCompleted)
                            .with_pid(handle.pid())
                            .with_code(0),
                    );
                }
                Outcome::Exited(code) => {
                    summary.failed += 1;
                    self.subs.emit(
                        Event::new(EventKind::JobFailed)
                            .with_pid(handle.pid())
                            .with_code(code),
                    );
                }
                Outcome::Signaled(signal) => {
                    summary.signaled += 1;
                    self.subs.emit(
                        Event::new(EventKind::JobSignaled)
                            .with_pid(handle.pid())
                            .with_signal(signal),
                    );
                }
                Outcome::Unknown => {
                    summary.anomalies += 1;
                    self.subs
                        .emit(Event::new(EventKind::JobDied).with_pid(handle.pid()));
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::JobHandle;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::{self, Cursor};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy)]
    enum Plan {
        /// Finish with `outcome`; lower `rank` finishes earlier.
        Finish { rank: u32, outcome: Outcome },
        RefuseStart,
    }

    #[derive(Default)]
    struct FakeState {
        plans: HashMap<String, Plan>,
        running: Vec<(JobHandle, u32, Outcome, String)>,
        next_pid: u32,
        max_running: usize,
        log: Vec<String>,
    }

    /// Deterministic spawner: completion order is driven by per-command
    /// ranks instead of wall-clock time.
    #[derive(Clone, Default)]
    struct FakeSpawner {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeSpawner {
        fn plan(self, command: &str, rank: u32, outcome: Outcome) -> Self {
            self.state
                .lock()
                .unwrap()
                .plans
                .insert(command.into(), Plan::Finish { rank, outcome });
            self
        }

        fn refuse(self, command: &str) -> Self {
            self.state
                .lock()
                .unwrap()
                .plans
                .insert(command.into(), Plan::RefuseStart);
            self
        }

        fn log(&self) -> Vec<String> {
            self.state.lock().unwrap().log.clone()
        }

        fn max_running(&self) -> usize {
            self.state.lock().unwrap().max_running
        }
    }

    #[async_trait]
    impl Spawn for FakeSpawner {
        fn start(&mut self, command: &str) -> io::Result<JobHandle> {
            let mut st = self.state.lock().unwrap();
            st.next_pid += 1;
            let pid = st.next_pid;
            // Unplanned commands finish in launch order.
            let plan = st
                .plans
                .get(command)
                .copied()
                .unwrap_or(Plan::Finish {
                    rank: pid,
                    outcome: Outcome::Exited(0),
                });
            match plan {
                Plan::RefuseStart => {
                    st.log.push(format!("refuse {command}"));
                    Err(io::Error::new(io::ErrorKind::Other, "no more processes"))
                }
                Plan::Finish { rank, outcome } => {
                    let handle = JobHandle(pid);
                    st.running.push((handle, rank, outcome, command.into()));
                    st.max_running = st.max_running.max(st.running.len());
                    st.log.push(format!("start {command}"));
                    Ok(handle)
                }
            }
        }

        async fn wait_any(&mut self) -> Option<(JobHandle, Outcome)> {
            let mut st = self.state.lock().unwrap();
            if st.running.is_empty() {
                return None;
            }
            let idx = st
                .running
                .iter()
                .enumerate()
                .min_by_key(|(_, (_, rank, _, _))| *rank)
                .map(|(i, _)| i)?;
            let (handle, _, outcome, command) = st.running.remove(idx);
            st.log.push(format!("reap {command}"));
            Some((handle, outcome))
        }
    }

    fn ready_set() -> SubscriberSet {
        let set = SubscriberSet::buffering();
        set.mark_ready();
        set
    }

    async fn run_input(
        spawner: FakeSpawner,
        input: &'static [u8],
        max_concurrent: usize,
    ) -> JobSummary {
        let mut source = LineSource::new(Cursor::new(input));
        let mut dispatcher = Dispatcher::new(spawner, ready_set(), max_concurrent);
        dispatcher.run(&mut source).await
    }

    #[tokio::test]
    async fn test_serial_run_preserves_input_order() {
        let spawner = FakeSpawner::default();
        let summary = run_input(spawner.clone(), b"a\nb\nc\n", 1).await;

        assert_eq!(summary.launched, 3);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.completed(), 3);
        assert_eq!(
            spawner.log(),
            vec!["start a", "reap a", "start b", "reap b", "start c", "reap c"]
        );
    }

    #[tokio::test]
    async fn test_limit_is_never_exceeded() {
        // Later launches finish first, the worst case for slot accounting.
        let spawner = FakeSpawner::default()
            .plan("c1", 50, Outcome::Exited(0))
            .plan("c2", 40, Outcome::Exited(0))
            .plan("c3", 30, Outcome::Exited(0))
            .plan("c4", 20, Outcome::Exited(0))
            .plan("c5", 10, Outcome::Exited(0));
        let summary = run_input(spawner.clone(), b"c1\nc2\nc3\nc4\nc5\n", 2).await;

        assert_eq!(summary.launched, 5);
        assert_eq!(summary.succeeded, 5);
        assert!(spawner.max_running() <= 2);

        // Launch order is input order regardless of completion order.
        let starts: Vec<String> = spawner
            .log()
            .into_iter()
            .filter(|entry| entry.starts_with("start "))
            .collect();
        assert_eq!(starts, vec!["start c1", "start c2", "start c3", "start c4", "start c5"]);
    }

    #[tokio::test]
    async fn test_next_command_waits_for_a_free_slot() {
        // Three commands, two slots, the second finishes fastest.
        let spawner = FakeSpawner::default()
            .plan("c1", 10, Outcome::Exited(0))
            .plan("c2", 1, Outcome::Exited(0))
            .plan("c3", 20, Outcome::Exited(0));
        let summary = run_input(spawner.clone(), b"c1\nc2\nc3\n", 2).await;

        assert_eq!(summary.succeeded, 3);
        let log = spawner.log();
        assert_eq!(
            &log[..4],
            ["start c1", "start c2", "reap c2", "start c3"]
        );
        assert!(spawner.max_running() <= 2);
    }

    #[tokio::test]
    async fn test_launch_failure_keeps_the_slot_free() {
        let spawner = FakeSpawner::default().refuse("a");
        let summary = run_input(spawner.clone(), b"a\nb\nc\n", 2).await;

        assert_eq!(summary.launched, 3);
        assert_eq!(summary.launch_failures, 1);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.completed(), 2);
        // Both remaining commands got to run concurrently: the refused start
        // did not eat a slot.
        assert_eq!(spawner.max_running(), 2);
        assert_eq!(spawner.log()[0], "refuse a");
    }

    #[tokio::test]
    async fn test_outcomes_are_classified() {
        let spawner = FakeSpawner::default()
            .plan("ok", 1, Outcome::Exited(0))
            .plan("bad", 2, Outcome::Exited(2))
            .plan("kill", 3, Outcome::Signaled(9))
            .plan("odd", 4, Outcome::Unknown);
        let summary = run_input(spawner, b"ok\nbad\nkill\nodd\n", 4).await;

        assert_eq!(summary.launched, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.signaled, 1);
        assert_eq!(summary.anomalies, 1);
        assert_eq!(summary.completed(), 4);
    }

    #[tokio::test]
    async fn test_blank_lines_are_never_launched() {
        let spawner = FakeSpawner::default();
        let summary = run_input(spawner.clone(), b"a\n  \n\tb \n", 1).await;

        assert_eq!(summary.launched, 2);
        let starts: Vec<String> = spawner
            .log()
            .into_iter()
            .filter(|entry| entry.starts_with("start "))
            .collect();
        assert_eq!(starts, vec!["start a", "start b"]);
    }

    /// Fails permanently after an initial chunk.
    struct FailAfter {
        chunk: Option<&'static [u8]>,
    }

    impl io::Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunk.take() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Err(io::Error::new(io::ErrorKind::Other, "disk on fire")),
            }
        }
    }

    struct Collect {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl crate::subscribers::Subscribe for Collect {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    #[tokio::test]
    async fn test_read_error_is_reported_once_and_absorbed() {
        let sink = Arc::new(Collect {
            seen: Mutex::new(Vec::new()),
        });
        let set = SubscriberSet::buffering();
        set.attach(sink.clone());
        set.mark_ready();

        let mut source = LineSource::new(FailAfter {
            chunk: Some(b"a\nb"),
        });
        let mut dispatcher = Dispatcher::new(FakeSpawner::default(), set.clone(), 2);
        let summary = dispatcher.run(&mut source).await;
        set.shutdown().await;

        // "a" launched before the failure; "b" never completed a line.
        assert_eq!(summary.launched, 1);
        assert_eq!(summary.succeeded, 1);

        let kinds = sink.seen.lock().unwrap().clone();
        let read_failures = kinds
            .iter()
            .filter(|k| **k == EventKind::SourceReadFailed)
            .count();
        assert_eq!(read_failures, 1);
    }
}
