use serde::Deserialize;
use serde::Serialize;
use strum::Display;

/// Whether an event starts or ends a period of camera activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    /// Activity started or is ongoing (Frigate sends `new` and `update`).
    #[serde(alias = "new", alias = "update")]
    Start,
    End,
}

/// How certain the event source is that the event reflects new media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Fidelity {
    /// The source knows whether a snapshot or clip exists (e.g. Frigate events).
    High,
    /// A bare activity signal, e.g. a motion or occupancy sensor.
    Low,
}

/// A camera activity event as delivered by an event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraEvent {
    pub camera_id: String,

    #[serde(rename = "type")]
    pub kind: EventKind,

    pub fidelity: Fidelity,

    /// A new snapshot exists for this event.
    #[serde(default)]
    pub snapshot: bool,

    /// A new clip exists for this event.
    #[serde(default)]
    pub clip: bool,
}

impl CameraEvent {
    pub fn start(camera_id: impl Into<String>, fidelity: Fidelity) -> Self {
        Self {
            camera_id: camera_id.into(),
            kind: EventKind::Start,
            fidelity,
            snapshot: false,
            clip: false,
        }
    }

    pub fn end(camera_id: impl Into<String>, fidelity: Fidelity) -> Self {
        Self {
            kind: EventKind::End,
            ..Self::start(camera_id, fidelity)
        }
    }

    pub fn with_snapshot(mut self, snapshot: bool) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    /// True for high-fidelity events that carry no new media.
    pub fn is_high_fidelity_without_media(&self) -> bool {
        self.fidelity == Fidelity::High && !self.snapshot && !self.clip
    }
}
