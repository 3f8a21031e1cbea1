//! # Global runtime configuration.
//!
//! Provides [`Config`], the settings shared by the dispatch loop and the
//! logging sink.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → use the number of available processing units

use std::num::NonZeroUsize;

/// Global configuration for a parrun invocation.
///
/// ## Field semantics
/// - `max_concurrent`: concurrency limit (`0` = one slot per processing unit)
/// - `verbose`: show informational progress messages (job launches and clean
///   completions) on stdout; warnings and errors are always shown
///
/// All fields are public; prefer [`Config::concurrency_limit`] over reading
/// `max_concurrent` directly so the `0` sentinel stays in one place.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of jobs to run concurrently.
    ///
    /// - `0` = autodetect (number of available processing units, min 1)
    /// - `n > 0` = at most `n` jobs run simultaneously
    pub max_concurrent: usize,

    /// Emit informational progress messages to stdout.
    pub verbose: bool,
}

impl Config {
    /// Returns the effective concurrency limit, always `>= 1`.
    ///
    /// Resolves the `0` sentinel to the host's available parallelism, falling
    /// back to `1` when that cannot be determined.
    #[inline]
    pub fn concurrency_limit(&self) -> usize {
        match self.max_concurrent {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            n => n,
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_concurrent = 0` (one slot per processing unit)
    /// - `verbose = false` (progress messages suppressed)
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            verbose: false,
        }
    }
}
