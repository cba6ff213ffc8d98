//! # nvkit - typed attribute lists and event watching
//!
//! nvkit models the self-describing name/value lists a storage subsystem uses
//! to exchange metadata and events, and runs a background watcher over its
//! event stream.
//!
//! ## Core Concepts
//!
//! - **AttributeList**: ordered, nested, dynamically typed key/value container
//! - **AttributeValue**: closed sum type over every tag the subsystem knows
//! - **Checkpoint**: `(sequence, seconds, nanoseconds)` watermark of an event stream
//! - **EventWatcher**: worker thread delivering events to callbacks, with
//!   interruptible blocking waits
//!
//! ## Usage
//!
//! ```rust
//! use nvkit::{AttributeList, Checkpoint};
//!
//! let mut event = AttributeList::new();
//! event.add_uint64("eid", 7)?;
//! event.add_int64_array("time", &[100, 200])?;
//! event.add_string("class", "sysevent.fs.zfs.pool_create")?;
//!
//! assert_eq!(Checkpoint::parse(&event), Checkpoint::new(7, 100, 200));
//! println!("{}", event.to_json(true));
//! # Ok::<(), nvkit::NvError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod events;
pub mod nvlist;
pub mod value;

pub use error::{NvError, NvResult};
pub use events::{
    channel_source, ChannelSource, ChannelSourceConfig, Checkpoint, EventSender, EventSource,
    EventWatcher, EventWatcherConfig, Interrupt, Interrupter, Polled,
};
pub use nvlist::{AttributeList, Cursor, Pair, RawList, RawPair};
pub use value::{AttributeValue, NvType};
