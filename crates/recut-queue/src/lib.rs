//! Durable job queue for the recut backend, built on Redis Streams.
//!
//! Delivery is at-least-once; exactly-one execution per job is enforced by
//! the registry's conditional `Queued -> Running` claim, not by the stream.

pub mod error;
pub mod message;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use message::QueuedJob;
pub use queue::{JobQueue, QueueConfig};
