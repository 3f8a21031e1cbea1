//! Event delivery: the subscriber contract and the fan-out set.
//!
//! - [`subscribe`]: the [`Subscribe`] trait implemented by event sinks;
//! - [`set`]: [`SubscriberSet`], the explicit two-phase logger object that
//!   buffers a startup backlog, fans events out to per-subscriber queues,
//!   and isolates slow or panicking subscribers;
//! - [`log`]: [`LogWriter`], the stdout/stderr sink used by the binary.

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
