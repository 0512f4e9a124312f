use serde::Deserialize;
use serde::Serialize;
use strum::Display;

/// Views the dashboard can navigate to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ViewName {
    #[default]
    Live,
    Clip,
    Clips,
    Snapshot,
    Snapshots,
    Recording,
    Recordings,
    Timeline,
    Image,
}

/// The view currently shown, as reported by the view controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub view: ViewName,

    /// Selected camera, if one has been chosen yet.
    #[serde(default)]
    pub camera: Option<String>,
}

/// Parameters for an explicit navigation command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewParams {
    pub view: ViewName,
    pub camera: String,
}

impl ViewParams {
    pub fn new(view: ViewName, camera: impl Into<String>) -> Self {
        Self {
            view,
            camera: camera.into(),
        }
    }
}
