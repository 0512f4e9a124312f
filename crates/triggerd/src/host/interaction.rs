use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::engine::InteractionTracker;

/// Tracks whether a user has recently interacted with the dashboard.
#[derive(Debug)]
pub struct Interactions {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl Interactions {
    /// Interactions count as active for `window` after they are recorded.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    pub fn record(&self) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(Instant::now());
        }
    }
}

impl InteractionTracker for Interactions {
    fn has_interaction(&self) -> bool {
        match self.last.lock() {
            Ok(last) => last.is_some_and(|at| at.elapsed() < self.window),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interaction_expires() {
        let interactions = Interactions::new(Duration::from_secs(60));
        assert!(!interactions.has_interaction());

        interactions.record();
        assert!(interactions.has_interaction());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(interactions.has_interaction());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!interactions.has_interaction());

        interactions.record();
        assert!(interactions.has_interaction());
    }
}
