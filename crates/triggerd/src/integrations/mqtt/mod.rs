mod binary_sensor;
mod client;
mod config;
mod frigate;
mod source;

pub use binary_sensor::parse_sensor_state;
pub use client::MqttClient;
pub use client::MqttMessage;
#[cfg(feature = "integration_mqtt")]
pub use client::RumqttcClient;
pub use config::Config as MqttConfig;
pub use frigate::FrigateEvent;
pub use source::events_for_message;
pub use source::EventSourceError;
pub use source::MqttEventSource;
