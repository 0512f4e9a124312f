//! Frigate event messages.
//!
//! Frigate publishes every tracked-object event on `<prefix>/events` as JSON:
//!
//! ```json
//! {"type": "new", "before": {...}, "after": {"camera": "front", "has_snapshot": true, "has_clip": false, ...}}
//! ```
//!
//! Only the `after` state matters for triggering.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::CameraConfig;
use crate::config::CameraEventFilter;
use crate::engine::CameraEvent;
use crate::engine::EventKind;
use crate::engine::Fidelity;

#[derive(Debug, Clone, Deserialize)]
pub struct FrigateEvent {
    /// `new`, `update` or `end`
    #[serde(rename = "type")]
    pub kind: EventKind,

    pub after: FrigateEventState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrigateEventState {
    pub camera: String,

    #[serde(default)]
    pub has_snapshot: bool,

    #[serde(default)]
    pub has_clip: bool,
}

impl FrigateEvent {
    /// Whether a camera with `filters` should react to this event.
    ///
    /// End events always pass so a triggered camera can be untriggered.
    fn passes(&self, filters: &[CameraEventFilter]) -> bool {
        self.kind == EventKind::End
            || filters.iter().any(|filter| match filter {
                CameraEventFilter::Events => true,
                CameraEventFilter::Clips => self.after.has_clip,
                CameraEventFilter::Snapshots => self.after.has_snapshot,
            })
    }

    /// Camera events for every configured camera backed by the Frigate camera.
    pub fn camera_events(&self, cameras: &BTreeMap<String, CameraConfig>) -> Vec<CameraEvent> {
        cameras
            .iter()
            .filter(|(camera_id, camera)| camera.frigate_name(camera_id) == self.after.camera)
            .filter(|(_, camera)| self.passes(&camera.triggers.events))
            .map(|(camera_id, _)| CameraEvent {
                camera_id: camera_id.clone(),
                kind: self.kind,
                fidelity: Fidelity::High,
                snapshot: self.after.has_snapshot,
                clip: self.after.has_clip,
            })
            .collect()
    }
}
