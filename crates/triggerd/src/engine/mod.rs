mod capabilities;
#[allow(clippy::module_inception)]
mod engine;
mod event;
pub mod policy;
pub mod state;
mod timer;
pub mod view;


pub use capabilities::Capabilities;
pub use capabilities::CameraTopology;
pub use capabilities::ConditionStore;
pub use capabilities::ConfigStore;
pub use capabilities::InteractionTracker;
pub use capabilities::RefreshTrigger;
pub use capabilities::ViewController;
pub use engine::TRIGGER_DEBOUNCE;
pub use engine::TriggersEngine;
pub use engine::TriggersHandle;
pub use event::CameraEvent;
pub use event::EventKind;
pub use event::Fidelity;
pub use policy::PolicySnapshot;
pub use policy::TriggersPolicy;
pub use state::TriggeredCameras;
pub use view::View;
pub use view::ViewName;
pub use view::ViewParams;
