//! Configuration file parsing and structures.
//!
//! triggerd uses a single TOML file. Every section except `[cameras]` has
//! defaults, and the file is re-read on reload so trigger policy can change
//! without restarting the engine.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

use crate::engine::TriggersPolicy;
use crate::engine::ViewName;
use crate::integrations::mqtt::MqttConfig;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub view: ViewConfig,

    /// Cameras keyed by camera id
    #[serde(default)]
    pub cameras: BTreeMap<String, CameraConfig>,

    /// MQTT event source; disabled when absent
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,

    /// HTTP API; disabled when absent
    #[serde(default)]
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"triggerd::engine" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

fn default_interaction_seconds() -> u64 {
    300
}

/// Dashboard view behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// View to show by default and after untrigger
    #[serde(default)]
    pub default: ViewName,

    /// Initially selected camera (defaults to the first camera by id)
    #[serde(default)]
    pub camera: Option<String>,

    /// Seconds a user interaction counts as active
    #[serde(default = "default_interaction_seconds")]
    pub interaction_seconds: u64,

    #[serde(default)]
    pub triggers: TriggersPolicy,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default: ViewName::default(),
            camera: None,
            interaction_seconds: default_interaction_seconds(),
            triggers: TriggersPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraConfig {
    /// Camera name used by Frigate (defaults to the camera id)
    #[serde(default)]
    pub frigate_camera_name: Option<String>,

    /// Cameras grouped under this one
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Group every configured camera under this one
    #[serde(default)]
    pub all_cameras: bool,

    #[serde(default)]
    pub triggers: CameraTriggersConfig,
}

impl CameraConfig {
    pub fn frigate_name<'a>(&'a self, camera_id: &'a str) -> &'a str {
        self.frigate_camera_name.as_deref().unwrap_or(camera_id)
    }
}

/// Which Frigate events trigger a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraEventFilter {
    /// Any event
    Events,
    /// Events with a clip
    Clips,
    /// Events with a snapshot
    Snapshots,
}

fn default_event_filters() -> Vec<CameraEventFilter> {
    vec![CameraEventFilter::Events]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraTriggersConfig {
    #[serde(default = "default_event_filters")]
    pub events: Vec<CameraEventFilter>,

    /// MQTT state topics of motion/occupancy sensors for this camera
    #[serde(default)]
    pub entities: Vec<String>,
}

impl Default for CameraTriggersConfig {
    fn default() -> Self {
        Self {
            events: default_event_filters(),
            entities: Vec::new(),
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub listen: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every camera reference names a configured camera
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(camera) = &self.view.camera {
            self.check_camera("view.camera", camera)?;
        }

        for (camera_id, camera) in &self.cameras {
            for dependency in &camera.dependencies {
                self.check_camera(&format!("cameras.{}.dependencies", camera_id), dependency)?;
            }
        }

        Ok(())
    }

    fn check_camera(&self, field: &str, camera: &str) -> Result<(), ConfigError> {
        if self.cameras.contains_key(camera) {
            Ok(())
        } else {
            Err(ConfigError::UnknownCamera {
                field: field.to_string(),
                camera: camera.to_string(),
            })
        }
    }

    /// The camera selected at startup
    pub fn initial_camera(&self) -> Option<String> {
        self.view
            .camera
            .clone()
            .or_else(|| self.cameras.keys().next().cloned())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} references unknown camera '{camera}'")]
    UnknownCamera { field: String, camera: String },
}
