//! # Real process spawner over the system shell.
//!
//! [`ShellSpawner`] starts each command with `sh -c <command>` (or `cmd /C`
//! on Windows) and keeps the wait future of every outstanding child in a
//! [`FuturesUnordered`], so "wait for any one child" is a single `next()`
//! on the stream. Completion order is whatever the OS reports.

use std::io;
use std::process::ExitStatus;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::process::Command;

use super::{JobHandle, Outcome, Spawn};

/// Spawns job processes through the system shell and reaps them in OS
/// completion order.
#[derive(Default)]
pub struct ShellSpawner {
    pending: FuturesUnordered<BoxFuture<'static, (JobHandle, io::Result<ExitStatus>)>>,
}

impl ShellSpawner {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Spawn for ShellSpawner {
    fn start(&mut self, command: &str) -> io::Result<JobHandle> {
        let mut child = shell_command(command).spawn()?;
        // `id()` is `Some` until the child has been reaped, which cannot have
        // happened yet for a freshly spawned process.
        let handle = JobHandle(child.id().unwrap_or(0));
        self.pending
            .push(async move { (handle, child.wait().await) }.boxed());
        Ok(handle)
    }

    async fn wait_any(&mut self) -> Option<(JobHandle, Outcome)> {
        self.pending
            .next()
            .await
            .map(|(handle, res)| (handle, classify(res)))
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

fn classify(res: io::Result<ExitStatus>) -> Outcome {
    match res {
        Ok(status) => classify_status(status),
        Err(_) => Outcome::Unknown,
    }
}

#[cfg(unix)]
fn classify_status(status: ExitStatus) -> Outcome {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        Outcome::Exited(code)
    } else if let Some(sig) = status.signal() {
        Outcome::Signaled(sig)
    } else {
        Outcome::Unknown
    }
}

#[cfg(not(unix))]
fn classify_status(status: ExitStatus) -> Outcome {
    match status.code() {
        Some(code) => Outcome::Exited(code),
        None => Outcome::Unknown,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_exit() {
        let mut spawner = ShellSpawner::new();
        let handle = spawner.start("true").expect("start");
        let (reaped, outcome) = spawner.wait_any().await.expect("one child");
        assert_eq!(reaped, handle);
        assert_eq!(outcome, Outcome::Exited(0));
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let mut spawner = ShellSpawner::new();
        spawner.start("exit 3").expect("start");
        let (_, outcome) = spawner.wait_any().await.expect("one child");
        assert_eq!(outcome, Outcome::Exited(3));
    }

    #[tokio::test]
    async fn test_signal_termination() {
        let mut spawner = ShellSpawner::new();
        spawner.start("kill -TERM $$").expect("start");
        let (_, outcome) = spawner.wait_any().await.expect("one child");
        assert_eq!(outcome, Outcome::Signaled(15));
    }

    #[tokio::test]
    async fn test_wait_any_with_no_children() {
        let mut spawner = ShellSpawner::new();
        assert!(spawner.wait_any().await.is_none());
    }
}
