//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! The callback maps raw key events for the configured key into flag
//! samples (`KeyPress` → flag set, `KeyRelease` → flag cleared), runs them
//! through a [`FlagDebouncer`] and forwards the resulting [`KeyEdge`]s
//! over a tokio channel.  Events for any other key are ignored.
//!
//! The thread also mirrors the debounced flag into a shared
//! `Arc<AtomicBool>`.  The recording state machine re-reads that flag when
//! its debounce timer fires, so the arm-or-discard decision is made
//! against the *live* key state rather than a value cached at press time.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Dropping the
//! [`HotkeyListener`] sets a stop flag so the callback discards further
//! events, but the OS thread itself stays blocked in the rdev loop until
//! the process exits.  It holds no resources that need cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use tokio::sync::mpsc;

use super::{FlagDebouncer, KeyEdge};

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.
///
/// Construct one with [`HotkeyListener::start`].  Drop it to stop
/// forwarding edges.
pub struct HotkeyListener {
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// Kept so the thread is not detached prematurely; never joined
    /// because `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn the listener thread.
    ///
    /// # Arguments
    ///
    /// * `key` — the push-to-talk [`rdev::Key`] (use
    ///   [`crate::hotkey::parse_key`] to obtain it from config).
    /// * `tx` — edge channel to the recording state machine.  The thread
    ///   uses `blocking_send` since it is not an async context.
    /// * `key_held` — shared flag updated on every edge; read by the state
    ///   machine's debounce timer at fire time.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(
        key: rdev::Key,
        tx: mpsc::Sender<KeyEdge>,
        key_held: Arc<AtomicBool>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut debouncer = FlagDebouncer::new();

                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    // Only the configured key reaches the debouncer; other
                    // flag combinations are not ours to interpret.
                    let flag = match event.event_type {
                        rdev::EventType::KeyPress(k) if k == key => true,
                        rdev::EventType::KeyRelease(k) if k == key => false,
                        _ => return,
                    };

                    if let Some(edge) = debouncer.observe(flag, Instant::now()) {
                        key_held.store(debouncer.is_pressed(), Ordering::Relaxed);
                        // blocking_send is safe from a non-async thread;
                        // a closed channel just means we are shutting down.
                        let _ = tx.blocking_send(edge);
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {e:?}");
                }
            })
            .expect("failed to spawn hotkey-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for HotkeyListener {
    /// Set the stop flag so the rdev callback stops forwarding edges.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
