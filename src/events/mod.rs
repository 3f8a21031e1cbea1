//! Runtime events describing job lifecycle and command-source conditions.
//!
//! - [`event`]: the [`Event`] value, its [`EventKind`] classification and
//!   [`Severity`] mapping.

mod event;

pub use event::{Event, EventKind, Severity};
