use std::collections::BTreeSet;
use std::collections::HashMap;

use tokio::time::Instant;

/// Cameras that are currently triggered, with the instant of their latest trigger.
///
/// A camera is present iff it is triggered. Recency comes from the stored
/// instant, never from iteration order.
#[derive(Debug, Clone, Default)]
pub struct TriggeredCameras {
    cameras: HashMap<String, Instant>,
}

impl TriggeredCameras {
    /// Record a trigger for `camera_id` at `at`.
    ///
    /// Returns true if the camera was not already triggered.
    pub fn trigger(&mut self, camera_id: &str, at: Instant) -> bool {
        self.cameras.insert(camera_id.to_string(), at).is_none()
    }

    /// Returns true if the camera was triggered.
    pub fn untrigger(&mut self, camera_id: &str) -> bool {
        self.cameras.remove(camera_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn contains(&self, camera_id: &str) -> bool {
        self.cameras.contains_key(camera_id)
    }

    pub fn triggered_at(&self, camera_id: &str) -> Option<Instant> {
        self.cameras.get(camera_id).copied()
    }

    pub fn camera_ids(&self) -> BTreeSet<String> {
        self.cameras.keys().cloned().collect()
    }

    /// The camera with the latest trigger instant.
    ///
    /// Cameras triggered at the same instant tie, and which one wins is unspecified.
    pub fn most_recent(&self) -> Option<&str> {
        self.cameras
            .iter()
            .max_by_key(|(_, at)| **at)
            .map(|(camera_id, _)| camera_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_trigger_is_idempotent() {
        let mut triggered = TriggeredCameras::default();
        let t0 = Instant::now();

        assert!(triggered.trigger("a", t0));
        assert!(!triggered.trigger("a", t0 + Duration::from_secs(1)));

        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered.triggered_at("a"), Some(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_most_recent() {
        let mut triggered = TriggeredCameras::default();
        assert_eq!(triggered.most_recent(), None);

        let t0 = Instant::now();
        triggered.trigger("b", t0 + Duration::from_secs(2));
        triggered.trigger("a", t0);
        triggered.trigger("c", t0 + Duration::from_secs(1));
        assert_eq!(triggered.most_recent(), Some("b"));

        triggered.trigger("a", t0 + Duration::from_secs(3));
        assert_eq!(triggered.most_recent(), Some("a"));

        triggered.untrigger("a");
        assert_eq!(triggered.most_recent(), Some("b"));
    }

    #[test]
    fn test_untrigger_unknown_camera() {
        let mut triggered = TriggeredCameras::default();
        assert!(!triggered.untrigger("a"));
        assert!(triggered.is_empty());
    }

    #[test]
    fn test_camera_ids_is_a_copy() {
        let mut triggered = TriggeredCameras::default();
        triggered.trigger("a", Instant::now());

        let mut ids = triggered.camera_ids();
        ids.insert("b".to_string());

        assert!(!triggered.contains("b"));
        assert_eq!(triggered.len(), 1);
    }
}
