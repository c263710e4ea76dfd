//! Bounded execution history and live event stream.
//!
//! `ExecutionEvent`/`ExecutionNotifier` ride a `tokio::sync::broadcast` stream rather than a
//! single-consumer channel, so several independent subscribers can watch the same execution, and
//! are paired with a bounded, FIFO-evicting map of `ExecutionRecord`s for past-run lookup.

mod error;
mod events;
mod record;
mod recorder;

pub use error::RecorderError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use record::{ExecutionRecord, ExecutionStatus};
pub use recorder::Recorder;
