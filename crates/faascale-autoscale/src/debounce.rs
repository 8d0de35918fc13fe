//! Scale-down debounce.
//!
//! A shrink is only applied after it has been pending for the decreasing
//! duration. The pending shrink is a spawned timer task holding the
//! receiving half of a `oneshot` channel; the owning scaler holds the
//! sending half. The channel is the only thing the two sides share:
//!
//! - the owner cancels by sending on it (or by dropping it);
//! - the task commits to firing by closing it once the delay elapses.
//!
//! Whichever side reaches the channel first wins, so a cancelled timer can
//! never perform a stale write, and "did the last timer fire?" is answered
//! by whether the channel is closed.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// What happened to the pending timer when it was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No timer was pending.
    Idle,
    /// The timer was stopped before it elapsed.
    Cancelled,
    /// The timer had already fired; its write may still be in flight.
    AlreadyFired,
}

struct PendingScaleDown {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PendingScaleDown {
    fn fired(&self) -> bool {
        self.cancel.is_closed()
    }
}

/// Debounce state of one function. Owned by its scaler, never shared.
pub struct Debounce {
    non_decreasing: bool,
    pending: Option<PendingScaleDown>,
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new()
    }
}

impl Debounce {
    /// A fresh debounce. Starts non-decreasing so the first shrink arms a
    /// timer.
    pub fn new() -> Self {
        Self {
            non_decreasing: true,
            pending: None,
        }
    }

    /// True if no shrink has been armed since load last held or grew.
    pub fn non_decreasing(&self) -> bool {
        self.non_decreasing
    }

    /// True if the most recent timer fired rather than being cancelled.
    pub fn last_trigger_fired(&self) -> bool {
        self.pending.as_ref().is_some_and(PendingScaleDown::fired)
    }

    /// True while a timer is counting down.
    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.fired())
    }

    /// Whether a shrink observed now should arm a new timer.
    pub fn should_arm(&self) -> bool {
        self.non_decreasing || self.last_trigger_fired()
    }

    /// Load held or grew, or another decision source took over: stop any
    /// pending shrink and reset the flags so the next shrink arms afresh.
    ///
    /// A timer past its commit point is awaited, so its write has landed
    /// before the caller issues one of its own.
    pub async fn hold(&mut self) -> CancelOutcome {
        self.non_decreasing = true;
        let Some(p) = self.pending.take() else {
            return CancelOutcome::Idle;
        };
        if p.cancel.send(()).is_ok() {
            debug!("scale-down timer cancelled");
            return CancelOutcome::Cancelled;
        }
        let _ = p.handle.await;
        CancelOutcome::AlreadyFired
    }

    /// Arm a timer that runs `on_fire` once `delay` elapses uncancelled.
    ///
    /// Replaces a previous timer; callers only arm when none is counting
    /// down (see [`Debounce::should_arm`]).
    pub fn arm<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // Cancelled, or the owner went away.
                _ = &mut cancel_rx => return,
            }

            // Commit point: from here on the owner sees the timer as fired.
            cancel_rx.close();
            if cancel_rx.try_recv().is_ok() {
                return;
            }
            on_fire.await;
        });

        if let Some(old) = self.pending.replace(PendingScaleDown {
            cancel: cancel_tx,
            handle,
        }) {
            let _ = old.cancel.send(());
        }
        self.non_decreasing = false;
    }

    /// Cancel the pending timer and wait for a fired one to finish its
    /// write.
    pub async fn shutdown(&mut self) {
        self.hold().await;
    }
}
