//! Background event consumer.
//!
//! One worker thread per [`EventWatcher`]. On start it runs a replay pass:
//! non-blocking polls that skip everything at or before the stored checkpoint
//! and deliver at most one newer event. It then loops on blocking polls and
//! delivers every non-empty event until stopped.
//!
//! The state mutex guards the checkpoint and the callback slots. The worker
//! takes it only to compare/update the checkpoint and to run callbacks, never
//! while blocked in the source.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::error::{NvError, NvResult};
use crate::events::checkpoint::Checkpoint;
use crate::events::source::{EventSource, Interrupt, Interrupter, Polled};
use crate::nvlist::AttributeList;

type EventCallback = Box<dyn FnMut(&AttributeList) + Send>;
type DropCallback = Box<dyn FnMut(u64) + Send>;
type ErrorCallback = Box<dyn FnMut(&NvError) + Send>;

/// Watcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventWatcherConfig {
    /// Name of the worker thread.
    pub thread_name: String,
    /// Pause before re-polling when a blocking poll comes back empty.
    pub idle_backoff_ms: u64,
}

impl EventWatcherConfig {
    fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

impl Default for EventWatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: "nvkit-events".to_string(),
            idle_backoff_ms: 10,
        }
    }
}

#[derive(Default)]
struct WatcherState {
    checkpoint: Checkpoint,
    on_event: Option<EventCallback>,
    on_drop: Option<DropCallback>,
    on_error: Option<ErrorCallback>,
}

impl WatcherState {
    fn dispatch(&mut self, event: &AttributeList, dropped: u64) {
        if !event.is_empty() {
            if let Some(on_event) = self.on_event.as_mut() {
                on_event(event);
            }
        }
        if dropped > 0 {
            warn!(dropped, "event source dropped events");
            if let Some(on_drop) = self.on_drop.as_mut() {
                on_drop(dropped);
            }
        }
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<WatcherState>,
    stop_requested: AtomicBool,
    running: AtomicBool,
}

impl Shared {
    fn stopping(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

struct Worker {
    handle: JoinHandle<()>,
    interrupter: Interrupter,
}

/// Delivers events from an [`EventSource`] to callbacks on a worker thread.
///
/// Checkpoint and callbacks persist across start/stop cycles. Callbacks run
/// on the worker thread with the state mutex held, so they must not call back
/// into the watcher: setters and `checkpoint()` would deadlock, and `stop()`
/// returns [`NvError::InvalidState`]. Dropping the watcher from a callback is
/// allowed; the worker exits once that callback returns.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use nvkit::{channel_source, ChannelSourceConfig, EventWatcher};
///
/// let (_tx, source) = channel_source(&ChannelSourceConfig::default());
/// let watcher = EventWatcher::new(Arc::new(source));
/// watcher.set_on_event(|event| println!("{event}"));
/// watcher.start()?;
/// assert!(watcher.is_running());
/// watcher.stop()?;
/// assert!(!watcher.is_running());
/// # Ok::<(), nvkit::NvError>(())
/// ```
pub struct EventWatcher<S: EventSource + ?Sized + 'static> {
    source: Arc<S>,
    cfg: EventWatcherConfig,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl<S: EventSource + ?Sized + 'static> EventWatcher<S> {
    /// Creates an idle watcher with the default configuration.
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        Self::with_config(source, EventWatcherConfig::default())
    }

    /// Creates an idle watcher.
    #[must_use]
    pub fn with_config(source: Arc<S>, cfg: EventWatcherConfig) -> Self {
        Self {
            source,
            cfg,
            shared: Arc::new(Shared::default()),
            worker: Mutex::new(None),
        }
    }

    /// Spawns the worker thread.
    ///
    /// A worker that ended on its own (after reporting an error) is reaped
    /// first, so a failed watcher can simply be started again.
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning` if the worker is still alive
    /// - `System` if the thread cannot be spawned
    pub fn start(&self) -> NvResult<()> {
        let mut slot = self.worker.lock();
        if self.shared.running.load(Ordering::Acquire) {
            return Err(NvError::AlreadyRunning);
        }
        if let Some(stale) = slot.take() {
            stale.interrupter.trigger();
            if stale.handle.join().is_err() {
                warn!("previous event watcher thread panicked");
            }
        }

        self.shared.stop_requested.store(false, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        let (interrupter, interrupt) = Interrupt::pair();
        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.shared);
        let idle_backoff = self.cfg.idle_backoff();
        let spawned = thread::Builder::new()
            .name(self.cfg.thread_name.clone())
            .spawn(move || run(&*source, &shared, &interrupt, idle_backoff));

        match spawned {
            Ok(handle) => {
                *slot = Some(Worker { handle, interrupter });
                debug!(thread = %self.cfg.thread_name, "event watcher started");
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                Err(NvError::system(
                    err.raw_os_error().unwrap_or(0),
                    format!("failed to spawn event watcher thread: {err}"),
                ))
            }
        }
    }

    /// Requests shutdown, interrupts the blocking poll and joins the worker.
    ///
    /// A no-op when idle.
    ///
    /// # Errors
    ///
    /// `InvalidState` if called from the worker thread itself (i.e. from a
    /// callback), or if the worker died from a panic that escaped it.
    pub fn stop(&self) -> NvResult<()> {
        let mut slot = self.worker.lock();
        let Some(worker) = slot.take() else {
            return Ok(());
        };
        if worker.handle.thread().id() == thread::current().id() {
            *slot = Some(worker);
            return Err(NvError::invalid_state(
                "stop() called from the event watcher thread",
            ));
        }
        drop(slot);

        self.shared.stop_requested.store(true, Ordering::Release);
        worker.interrupter.trigger();
        let joined = worker.handle.join();
        self.shared.running.store(false, Ordering::Release);
        debug!(thread = %self.cfg.thread_name, "event watcher stopped");

        joined.map_err(|payload| {
            NvError::invalid_state(format!(
                "event watcher thread panicked: {}",
                panic_message(&*payload)
            ))
        })
    }

    /// Returns true while the worker thread is alive.
    ///
    /// Becomes false on its own once the worker reports an error.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Last checkpoint stored by the worker or [`EventWatcher::set_checkpoint`].
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        self.shared.state.lock().checkpoint
    }

    /// Replaces the stored checkpoint, e.g. to resume where a previous run ended.
    pub fn set_checkpoint(&self, checkpoint: impl Into<Checkpoint>) {
        self.shared.state.lock().checkpoint = checkpoint.into();
    }

    /// Callback for delivered, non-empty events.
    pub fn set_on_event(&self, callback: impl FnMut(&AttributeList) + Send + 'static) {
        self.shared.state.lock().on_event = Some(Box::new(callback));
    }

    /// Callback for the number of events the source reports as dropped.
    pub fn set_on_drop(&self, callback: impl FnMut(u64) + Send + 'static) {
        self.shared.state.lock().on_drop = Some(Box::new(callback));
    }

    /// Callback for the error that ends the worker. Called at most once per run.
    pub fn set_on_error(&self, callback: impl FnMut(&NvError) + Send + 'static) {
        self.shared.state.lock().on_error = Some(Box::new(callback));
    }

    /// Configuration the watcher was built with.
    #[must_use]
    pub fn config(&self) -> &EventWatcherConfig {
        &self.cfg
    }

    /// Source the worker polls.
    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }
}

impl<S: EventSource + ?Sized + 'static> fmt::Debug for EventWatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventWatcher")
            .field("config", &self.cfg)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl<S: EventSource + ?Sized + 'static> Drop for EventWatcher<S> {
    fn drop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::Release);
        let on_worker = self
            .worker
            .lock()
            .as_ref()
            .is_some_and(|w| w.handle.thread().id() == thread::current().id());
        if on_worker {
            // Dropped from a callback. The worker exits once it returns; the
            // interrupter goes with `self` and wakes any later blocking poll.
            debug!(thread = %self.cfg.thread_name, "event watcher dropped from its own thread");
            return;
        }
        if let Err(err) = self.stop() {
            warn!(error = %err, "event watcher did not stop cleanly");
        }
    }
}

fn run<S: EventSource + ?Sized>(
    source: &S,
    shared: &Shared,
    interrupt: &Interrupt,
    idle_backoff: Duration,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        watch(source, shared, interrupt, idle_backoff)
    }));
    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err),
        Err(payload) => Some(NvError::invalid_state(format!(
            "event watcher panicked: {}",
            panic_message(&*payload)
        ))),
    };

    if let Some(err) = failure {
        error!(error = %err, "event watcher terminated");
        let mut state = shared.state.lock();
        if let Some(on_error) = state.on_error.as_mut() {
            if panic::catch_unwind(AssertUnwindSafe(|| on_error(&err))).is_err() {
                error!("error callback panicked");
            }
        }
    }
    shared.running.store(false, Ordering::Release);
}

fn watch<S: EventSource + ?Sized>(
    source: &S,
    shared: &Shared,
    interrupt: &Interrupt,
    idle_backoff: Duration,
) -> NvResult<()> {
    replay(source, shared, interrupt)?;
    steady(source, shared, interrupt, idle_backoff)
}

fn replay<S: EventSource + ?Sized>(source: &S, shared: &Shared, interrupt: &Interrupt) -> NvResult<()> {
    let mut skipped = 0u64;
    while !shared.stopping() {
        let (event, dropped) = match source.next_event(false, interrupt) {
            Ok(Polled::Event { event, dropped }) => (event, dropped),
            Ok(Polled::Empty) => break,
            Err(err) if err.is_interrupted() => break,
            Err(err) => return Err(err),
        };

        let checkpoint = Checkpoint::parse(&event);
        let mut state = shared.state.lock();
        if !checkpoint.is_newer_than(&state.checkpoint) {
            trace!(
                sequence = checkpoint.sequence,
                seconds = checkpoint.seconds,
                nanos = checkpoint.nanos,
                "skipping replayed event"
            );
            skipped += 1;
            continue;
        }

        state.checkpoint = checkpoint;
        state.dispatch(&event, dropped);
        drop(state);
        debug!(skipped, sequence = checkpoint.sequence, "replay caught up");
        return Ok(());
    }
    debug!(skipped, "replay found no newer event");
    Ok(())
}

fn steady<S: EventSource + ?Sized>(
    source: &S,
    shared: &Shared,
    interrupt: &Interrupt,
    idle_backoff: Duration,
) -> NvResult<()> {
    while !shared.stopping() {
        let (event, dropped) = match source.next_event(true, interrupt) {
            Ok(Polled::Event { event, dropped }) => (event, dropped),
            Ok(Polled::Empty) => {
                if interrupt.wait_timeout(idle_backoff) {
                    break;
                }
                continue;
            }
            // A fired interrupt stays fired; only a spurious wakeup is retried.
            Err(err) if err.is_interrupted() => {
                if interrupt.is_triggered() {
                    break;
                }
                continue;
            }
            Err(err) => return Err(err),
        };

        let checkpoint = Checkpoint::parse(&event);
        let mut state = shared.state.lock();
        state.dispatch(&event, dropped);
        if !checkpoint.is_zero() {
            state.checkpoint = checkpoint;
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return *msg;
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.as_str();
    }
    "non-string panic payload"
}
