//! In-process event source backed by a bounded channel.
//!
//! Producers never block: when the queue is full the event is discarded and
//! counted, and the count rides along with the next event the consumer
//! receives.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NvError, NvResult};
use crate::events::source::{EventSource, Interrupt, Polled};
use crate::nvlist::AttributeList;

/// `EPIPE`, reported when every sender is gone.
const CHANNEL_CLOSED: i32 = 32;

/// Sizing of a [`ChannelSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSourceConfig {
    /// Max queued events before producers start dropping. Clamped to at least 1.
    pub capacity: usize,
}

impl Default for ChannelSourceConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Producer half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<AttributeList>,
    dropped: Arc<AtomicU64>,
}

/// Consumer half; implements [`EventSource`].
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<AttributeList>,
    dropped: Arc<AtomicU64>,
}

/// Creates a connected producer/source pair.
#[must_use]
pub fn channel_source(cfg: &ChannelSourceConfig) -> (EventSender, ChannelSource) {
    let (tx, rx) = bounded(cfg.capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        EventSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        ChannelSource { rx, dropped },
    )
}

impl EventSender {
    /// Queues `event` without blocking. Returns false if it was dropped.
    pub fn send(&self, event: AttributeList) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(pending_drops = total, "event queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Drops recorded but not yet reported to the consumer.
    #[must_use]
    pub fn pending_drops(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ChannelSource {
    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no event is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    fn deliver(&self, event: AttributeList) -> Polled {
        Polled::Event {
            event,
            dropped: self.dropped.swap(0, Ordering::Relaxed),
        }
    }
}

impl EventSource for ChannelSource {
    fn next_event(&self, blocking: bool, interrupt: &Interrupt) -> NvResult<Polled> {
        if !blocking {
            return match self.rx.try_recv() {
                Ok(event) => Ok(self.deliver(event)),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(Polled::Empty),
            };
        }

        select! {
            recv(self.rx) -> msg => match msg {
                Ok(event) => Ok(self.deliver(event)),
                Err(_) => Err(NvError::system(CHANNEL_CLOSED, "event channel closed")),
            },
            recv(interrupt.receiver()) -> _ => Err(NvError::Interrupted),
        }
    }
}
