pub mod api;
pub mod config;
pub mod engine;
pub mod host;
pub mod integrations;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use engine::CameraEvent;
pub use engine::TriggersEngine;
pub use engine::TriggersHandle;
pub use host::Host;
