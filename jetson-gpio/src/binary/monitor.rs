//! Edge-event monitoring for input lines.
//!
//! Each monitored line gets a dedicated OS thread running a single-threaded
//! Tokio runtime with two tasks:
//!
//! - a watcher that owns the inotify watch on the line's `value` file,
//!   re-reads the value on every modification and sends the sampled
//!   [`Signal`] down an mpsc channel;
//! - a dispatcher that receives those signals and runs the registered
//!   callbacks.
//!
//! Shutdown is explicit: dropping the [`EdgeMonitor`] cancels its token and
//! joins the thread. The watcher exits on cancellation, which closes the
//! channel and lets the dispatcher drain and finish.

use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
    thread::JoinHandle,
};

use futures::stream::StreamExt;
use inotify::{EventMask, Inotify, WatchMask};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    line::{Edge, Signal},
    sysfs::ControlFile,
    tracing::prelude::*,
};

/// Signals buffered between the watcher and the dispatcher.
const SIGNAL_QUEUE_DEPTH: usize = 64;

/// Callback invoked with the sampled line level.
pub type EdgeCallback = Box<dyn Fn(Signal) + Send + 'static>;

/// Registered callbacks, kept in registration order per edge kind.
#[derive(Default)]
pub struct CallbackTable {
    both: Vec<EdgeCallback>,
    rising: Vec<EdgeCallback>,
    falling: Vec<EdgeCallback>,
}

impl CallbackTable {
    pub fn register(&mut self, edge: Edge, callback: EdgeCallback) {
        match edge {
            Edge::Both => self.both.push(callback),
            Edge::Rising => self.rising.push(callback),
            Edge::Falling => self.falling.push(callback),
        }
    }

    pub fn count(&self, edge: Edge) -> usize {
        match edge {
            Edge::Both => self.both.len(),
            Edge::Rising => self.rising.len(),
            Edge::Falling => self.falling.len(),
        }
    }

    /// Run every `Both` callback, then the `Rising` or `Falling` callbacks
    /// matching `signal`. Returns how many callbacks ran.
    pub fn dispatch(&self, signal: Signal) -> usize {
        let directional = match signal {
            Signal::High => &self.rising,
            Signal::Low => &self.falling,
            Signal::Unknown => return 0,
        };

        for callback in self.both.iter().chain(directional) {
            callback(signal);
        }

        self.both.len() + directional.len()
    }
}

pub type SharedCallbacks = Arc<Mutex<CallbackTable>>;

/// Handle to a running monitor thread.
pub struct EdgeMonitor {
    shutdown: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl EdgeMonitor {
    /// Start monitoring `value_path`, dispatching into `callbacks`.
    ///
    /// The watch, the read handle and the runtime are all created before the
    /// thread starts, so setup failures are reported here.
    pub fn spawn(name: &str, value_path: &Path, callbacks: SharedCallbacks) -> Result<Self> {
        let inotify = Inotify::init()?;
        inotify.watches().add(value_path, WatchMask::MODIFY)?;
        let value = ControlFile::open_read(value_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let shutdown = CancellationToken::new();
        let thread = std::thread::Builder::new()
            .name(format!("edge-{}", name))
            .spawn({
                let shutdown = shutdown.clone();
                move || {
                    runtime.block_on(run(inotify, value, callbacks, shutdown));
                    trace!("Edge monitor thread exiting");
                }
            })
            .map_err(Error::Io)?;

        debug!(line = name, path = %value_path.display(), "Edge monitor started");

        Ok(Self {
            shutdown,
            thread: Some(thread),
        })
    }

    /// Stop the monitor and wait for its thread to finish.
    pub fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Edge monitor thread panicked");
            }
        }
    }
}

impl Drop for EdgeMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    inotify: Inotify,
    mut value: ControlFile,
    callbacks: SharedCallbacks,
    shutdown: CancellationToken,
) {
    let mut events = match inotify.into_event_stream([0u8; 1024]) {
        Ok(events) => events,
        Err(e) => {
            error!(error = %e, "Failed to create inotify event stream");
            return;
        }
    };

    let (signal_tx, mut signal_rx) = mpsc::channel::<Signal>(SIGNAL_QUEUE_DEPTH);

    let watcher = async move {
        loop {
            tokio::select! {
                event = events.next() => {
                    let event = match event {
                        Some(Ok(event)) => event,
                        Some(Err(e)) => {
                            error!(error = %e, "Error from inotify watch");
                            return;
                        }
                        None => {
                            warn!("Inotify event stream ended");
                            return;
                        }
                    };

                    if !event.mask.contains(EventMask::MODIFY) {
                        continue;
                    }

                    let signal = match value.read_byte() {
                        Ok(Some(byte)) => Signal::from_sysfs_byte(byte),
                        Ok(None) => {
                            trace!(path = %value.path().display(), "Value file empty, ignoring event");
                            continue;
                        }
                        Err(e) => {
                            warn!(path = %value.path().display(), error = %e, "Failed to sample line");
                            continue;
                        }
                    };

                    trace!(%signal, "Line changed");
                    if signal_tx.send(signal).await.is_err() {
                        return;
                    }
                }

                _ = shutdown.cancelled() => {
                    trace!("Shutdown requested, exiting edge watcher");
                    return;
                }
            }
        }
    };

    let dispatcher = async move {
        while let Some(signal) = signal_rx.recv().await {
            let table = callbacks.lock().unwrap_or_else(PoisonError::into_inner);
            table.dispatch(signal);
        }
    };

    tokio::join!(watcher, dispatcher);
}
