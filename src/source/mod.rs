//! The command source: turns a byte stream into trimmed command lines.
//!
//! - [`lines`]: [`LineSource`], the incremental line reader, and [`Input`],
//!   the file-or-stdin stream it is opened over.

mod lines;

pub use lines::{Input, LineSource};
