//! The consumer side: receive configuration, the handler contract, the
//! per-message lifecycle controller and the poll loop that drives it.

pub mod config;
mod functions;
pub mod lifecycle;
pub mod scheduler;

pub use config::{ReceiveConfig, ReceiveOptions};
pub use functions::{HandlerFn, MessageHandler};
pub use lifecycle::{Disposition, HandlerOutcome, LifecycleController, ReleasePolicy};
pub use scheduler::{BatchReport, PollHandle, PollScheduler};
