use tokio::sync::watch;

use crate::engine::RefreshTrigger;

/// Counts refresh requests and wakes anything watching for them.
#[derive(Debug)]
pub struct Refresher {
    requests: watch::Sender<u64>,
}

impl Default for Refresher {
    fn default() -> Self {
        let (requests, _) = watch::channel(0);
        Self { requests }
    }
}

impl Refresher {
    /// Refresh requests made so far.
    pub fn count(&self) -> u64 {
        *self.requests.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.requests.subscribe()
    }
}

impl RefreshTrigger for Refresher {
    fn request_refresh(&self) {
        self.requests.send_modify(|count| *count += 1);
        tracing::debug!("Refresh requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_counts() {
        let refresher = Refresher::default();
        let mut rx = refresher.subscribe();

        refresher.request_refresh();
        refresher.request_refresh();

        assert_eq!(refresher.count(), 2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);
    }
}
