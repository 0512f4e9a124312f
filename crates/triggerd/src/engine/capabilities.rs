//! Narrow interfaces to the stores and controllers the engine reacts through.
//!
//! The engine holds no copies of anything behind these traits. It re-reads
//! them on every call, so a changed configuration or view takes effect on
//! the next event.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::policy::PolicySnapshot;
use super::view::View;
use super::view::ViewParams;

/// Read access to the trigger configuration.
pub trait ConfigStore: Send + Sync {
    /// Current policy, or `None` while no configuration is loaded.
    fn policy(&self) -> Option<PolicySnapshot>;
}

/// The dashboard's navigation layer.
pub trait ViewController: Send + Sync {
    fn view(&self) -> Option<View>;

    fn set_view(&self, params: ViewParams);

    /// Navigate to the configured default view. With `None` the selected camera is kept.
    fn set_default_view(&self, camera: Option<&str>);
}

pub trait CameraTopology: Send + Sync {
    /// The camera itself plus every camera grouped under it. Empty if unknown.
    fn dependent_cameras(&self, camera_id: &str) -> BTreeSet<String>;
}

/// Shared condition state that other components observe.
pub trait ConditionStore: Send + Sync {
    fn triggered(&self) -> Option<BTreeSet<String>>;

    /// `None` clears the triggered condition.
    fn set_triggered(&self, triggered: Option<BTreeSet<String>>);
}

pub trait InteractionTracker: Send + Sync {
    fn has_interaction(&self) -> bool;
}

pub trait RefreshTrigger: Send + Sync {
    fn request_refresh(&self);
}

/// The full set of collaborators handed to the engine at construction.
#[derive(Clone)]
pub struct Capabilities {
    pub config: Arc<dyn ConfigStore>,
    pub view: Arc<dyn ViewController>,
    pub topology: Arc<dyn CameraTopology>,
    pub condition: Arc<dyn ConditionStore>,
    pub interaction: Arc<dyn InteractionTracker>,
    pub refresh: Arc<dyn RefreshTrigger>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
