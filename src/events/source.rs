//! Event source contract and the interrupt primitive.
//!
//! A source hands out one event per call. Blocking calls must also watch the
//! [`Interrupt`] they are given and return [`NvError::Interrupted`] as soon as
//! it fires, without producing an event.

use std::time::Duration;

use crossbeam_channel::{bounded, never, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::NvResult;
use crate::nvlist::AttributeList;

#[cfg(doc)]
use crate::error::NvError;

/// Outcome of one poll.
#[derive(Debug)]
pub enum Polled {
    /// An event, plus the number of events lost since the previous poll.
    Event {
        /// Event payload.
        event: AttributeList,
        /// Events the source dropped since the last poll.
        dropped: u64,
    },
    /// Nothing available (non-blocking poll only).
    Empty,
}

/// Blocking event producer consumed by [`crate::EventWatcher`].
///
/// The watcher is assumed to be the only consumer of a source instance.
pub trait EventSource: Send + Sync {
    /// Retrieves the next event.
    ///
    /// With `blocking == false`, returns `Ok(Polled::Empty)` when nothing is
    /// queued. With `blocking == true`, waits until an event arrives or
    /// `interrupt` fires, in which case it returns `Err(NvError::Interrupted)`.
    /// Any other error ends the watcher task.
    fn next_event(&self, blocking: bool, interrupt: &Interrupt) -> NvResult<Polled>;
}

/// Receiving half of a one-shot wake signal.
///
/// Fires when the paired [`Interrupter`] is triggered or dropped, and stays
/// fired: every later wait returns immediately.
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: Receiver<()>,
}

/// Sending half of a wake signal.
#[derive(Debug)]
pub struct Interrupter {
    tx: Sender<()>,
}

impl Interrupt {
    /// Creates a connected pair.
    #[must_use]
    pub fn pair() -> (Interrupter, Self) {
        let (tx, rx) = bounded(0);
        (Interrupter { tx }, Self { rx })
    }

    /// An interrupt that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self { rx: never() }
    }

    /// Channel to race against in a `crossbeam_channel::select!`.
    ///
    /// Receiving from it yields `Err` once the interrupt fired; it never
    /// yields a value.
    #[must_use]
    pub const fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    /// Returns true once the interrupt fired.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleeps up to `timeout`. Returns true if woken by the interrupt.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Disconnected))
    }
}

impl Interrupter {
    /// Fires the paired interrupt.
    pub fn trigger(self) {
        drop(self.tx);
    }
}
