//! Host main-loop idle-notification source.
//!
//! A single designated thread owns the idle-handler set; all mutation
//! of that set goes through the thread's command channel, so handlers
//! themselves need no locking. [`MainLoop`] is the in-process adapter
//! used by the shell and tests; embedders with a platform loop of their
//! own implement [`IdleSource`] over it instead.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Identifies one handler registration.
pub type RegistrationId = u64;

/// A repeatable idle-notification handler.
///
/// Returning `false` asks the loop to drop the registration.
pub trait IdleHandler: Send {
    fn on_host_idle(&mut self) -> bool;
}

/// Add/remove entry points of a host idle-notification source.
///
/// Both calls complete synchronously on the loop's designated thread:
/// registration happens-before any idle delivery, and removal
/// happens-before the call returns, so teardown can rely on no further
/// deliveries. Neither call may be made from inside a handler.
pub trait IdleSource: Send + Sync {
    fn add_handler(&self, handler: Box<dyn IdleHandler>) -> RegistrationId;
    fn remove_handler(&self, id: RegistrationId);
}

enum Command {
    Add {
        id: RegistrationId,
        handler: Box<dyn IdleHandler>,
        done: Sender<()>,
    },
    Remove {
        id: RegistrationId,
        done: Sender<()>,
    },
    Idle {
        done: Sender<()>,
    },
    Shutdown,
}

/// In-process host main loop.
pub struct MainLoop {
    tx: Sender<Command>,
    next_id: AtomicU64,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl MainLoop {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        let thread = thread::Builder::new()
            .name("host-main-loop".to_string())
            .spawn(move || {
                debug!("host main loop started");
                run_loop(rx);
                debug!("host main loop stopped");
            })
            .expect("failed to spawn host main loop thread");

        Self {
            tx,
            next_id: AtomicU64::new(1),
            thread: Mutex::new(Some(thread)),
        }
    }

    /// Deliver one idle notification sweep to every registered handler.
    /// Blocks until the sweep has run.
    pub fn idle(&self) {
        let (done, ack) = bounded(1);
        if self.tx.send(Command::Idle { done }).is_ok() {
            let _ = ack.recv();
        }
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleSource for MainLoop {
    fn add_handler(&self, handler: Box<dyn IdleHandler>) -> RegistrationId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (done, ack) = bounded(1);
        if self.tx.send(Command::Add { id, handler, done }).is_ok() {
            let _ = ack.recv();
        }
        debug!(id, "idle handler registered");
        id
    }

    fn remove_handler(&self, id: RegistrationId) {
        let (done, ack) = bounded(1);
        if self.tx.send(Command::Remove { id, done }).is_ok() {
            let _ = ack.recv();
        }
        debug!(id, "idle handler removed");
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.lock().unwrap().take() {
            let _ = thread.join();
        }
    }
}

fn run_loop(rx: Receiver<Command>) {
    // Sole owner of the handler set; no lock needed.
    let mut handlers: Vec<(RegistrationId, Box<dyn IdleHandler>)> = Vec::new();

    while let Ok(command) = rx.recv() {
        match command {
            Command::Add { id, handler, done } => {
                handlers.push((id, handler));
                let _ = done.send(());
            }
            Command::Remove { id, done } => {
                handlers.retain(|(held, _)| *held != id);
                let _ = done.send(());
            }
            Command::Idle { done } => {
                handlers.retain_mut(|(id, handler)| {
                    let keep = handler.on_host_idle();
                    if !keep {
                        debug!(id = *id, "idle handler dropped by its own request");
                    }
                    keep
                });
                let _ = done.send(());
            }
            Command::Shutdown => {
                if !handlers.is_empty() {
                    info!(remaining = handlers.len(), "host main loop shut down");
                }
                break;
            }
        }
    }
}
