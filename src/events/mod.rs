//! Event delivery from the storage subsystem.
//!
//! An [`EventSource`] yields attribute-list events; the [`EventWatcher`]
//! consumes them on a dedicated thread, orders them by [`Checkpoint`] during
//! replay and hands them to user callbacks. [`ChannelSource`] is an in-process
//! source for embedding and tests.

/// In-process bounded event source.
pub mod channel;
/// Event-stream watermark.
pub mod checkpoint;
/// Source contract and interrupt primitive.
pub mod source;
/// Background consumer.
pub mod watcher;

pub use channel::{channel_source, ChannelSource, ChannelSourceConfig, EventSender};
pub use checkpoint::{Checkpoint, EVENT_ID_KEY, EVENT_TIME_KEY};
pub use source::{EventSource, Interrupt, Interrupter, Polled};
pub use watcher::{EventWatcher, EventWatcherConfig};
