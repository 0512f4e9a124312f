//! Wake-ups for the trigger engine.
//!
//! Timers never touch engine state directly. Each one is a spawned task that
//! sleeps and then posts a [`Wake`] to the engine's channel, so all state
//! changes happen on the engine's own task.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// A timer that fell due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Wake {
    /// The untrigger timer identified by `token` elapsed for `camera_id`.
    Untrigger { camera_id: String, token: u64 },

    /// The debounce window closed.
    Debounce,
}

/// Timers post to an unbounded channel so they never wait on the engine.
pub(crate) type WakeSender = mpsc::UnboundedSender<Wake>;
pub(crate) type WakeReceiver = mpsc::UnboundedReceiver<Wake>;

struct ArmedTimer {
    token: u64,
    handle: JoinHandle<()>,
}

/// One single-shot untrigger timer per camera.
pub(crate) struct UntriggerTimers {
    timers: HashMap<String, ArmedTimer>,
    next_token: u64,
    wake_tx: WakeSender,
}

impl UntriggerTimers {
    pub fn new(wake_tx: WakeSender) -> Self {
        Self {
            timers: HashMap::new(),
            next_token: 0,
            wake_tx,
        }
    }

    /// Start the untrigger timer for a camera, replacing any existing one.
    pub fn start(&mut self, camera_id: &str, after: Duration) {
        self.cancel(camera_id);

        let token = self.next_token;
        self.next_token += 1;

        // A delay past the clock's range never elapses.
        let deadline = Instant::now().checked_add(after);
        let tx = self.wake_tx.clone();
        let wake = Wake::Untrigger {
            camera_id: camera_id.to_string(),
            token,
        };
        let handle = tokio::spawn(async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
            // The engine is gone if this fails, nothing left to untrigger.
            let _ = tx.send(wake);
        });

        debug!(
            "Untrigger timer {} armed for {} ({:?})",
            token, camera_id, after
        );
        self.timers
            .insert(camera_id.to_string(), ArmedTimer { token, handle });
    }

    /// Returns true if a timer was running for the camera.
    pub fn cancel(&mut self, camera_id: &str) -> bool {
        if let Some(timer) = self.timers.remove(camera_id) {
            timer.handle.abort();
            debug!("Untrigger timer {} for {} cancelled", timer.token, camera_id);
            true
        } else {
            false
        }
    }

    /// Claim a wake-up. Returns false when `token` is no longer the camera's
    /// current timer, i.e. the wake-up is stale.
    pub fn take_if_current(&mut self, camera_id: &str, token: u64) -> bool {
        match self.timers.get(camera_id) {
            Some(timer) if timer.token == token => {
                self.timers.remove(camera_id);
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub fn contains(&self, camera_id: &str) -> bool {
        self.timers.contains_key(camera_id)
    }
}

impl Drop for UntriggerTimers {
    fn drop(&mut self) {
        for timer in self.timers.values() {
            timer.handle.abort();
        }
    }
}

/// Trailing-edge debounce with a fixed window.
///
/// The first push arms one wake-up at the end of the window. Later pushes
/// replace the pending value without moving the wake-up, so at most one value
/// comes out per window and it is always the latest.
pub(crate) struct Debounce<T> {
    window: Duration,
    pending: Option<T>,
    armed: Option<JoinHandle<()>>,
    wake_tx: WakeSender,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration, wake_tx: WakeSender) -> Self {
        Self {
            window,
            pending: None,
            armed: None,
            wake_tx,
        }
    }

    pub fn push(&mut self, value: T) {
        self.pending = Some(value);

        if self.armed.is_none() {
            let deadline = Instant::now() + self.window;
            let tx = self.wake_tx.clone();
            self.armed = Some(tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                let _ = tx.send(Wake::Debounce);
            }));
        }
    }

    /// Take the pending value when the window closes.
    pub fn fire(&mut self) -> Option<T> {
        self.armed = None;
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Drop for Debounce<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.armed.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_untrigger_timer_fires_after_duration() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = UntriggerTimers::new(tx);

        let start = Instant::now();
        timers.start("a", Duration::from_secs(5));
        assert!(timers.contains("a"));

        let wake = rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(
            wake,
            Wake::Untrigger {
                camera_id: "a".to_string(),
                token: 0
            }
        );
        assert!(timers.take_if_current("a", 0));
        assert!(!timers.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = UntriggerTimers::new(tx);

        let start = Instant::now();
        timers.start("a", Duration::from_secs(5));
        tokio::time::advance(Duration::from_secs(3)).await;
        timers.start("a", Duration::from_secs(5));

        // Only the replacement fires, 5s after the restart.
        let wake = rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(8));
        assert_eq!(
            wake,
            Wake::Untrigger {
                camera_id: "a".to_string(),
                token: 1
            }
        );
        assert!(!timers.take_if_current("a", 0));
        assert!(timers.take_if_current("a", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = UntriggerTimers::new(tx);

        timers.start("a", Duration::from_secs(1));
        assert!(timers.cancel("a"));
        assert!(!timers.cancel("a"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_delay_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = UntriggerTimers::new(tx);

        timers.start("a", Duration::from_secs(u64::MAX));
        assert!(timers.contains("a"));

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert!(rx.try_recv().is_err());

        // Still replaceable by a sane delay.
        timers.start("a", Duration::from_secs(1));
        assert_eq!(
            rx.recv().await.unwrap(),
            Wake::Untrigger {
                camera_id: "a".to_string(),
                token: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keeps_latest_value() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debounce = Debounce::new(Duration::from_secs(1), tx);

        let start = Instant::now();
        debounce.push(1);
        tokio::time::advance(Duration::from_millis(400)).await;
        debounce.push(2);
        assert!(debounce.is_pending());

        assert_eq!(rx.recv().await.unwrap(), Wake::Debounce);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(debounce.fire(), Some(2));
        assert_eq!(debounce.fire(), None);

        // The next push opens a new window.
        debounce.push(3);
        assert_eq!(rx.recv().await.unwrap(), Wake::Debounce);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(debounce.fire(), Some(3));
    }
}
