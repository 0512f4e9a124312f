use serde::Deserialize;

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "triggerd".to_string()
}

fn default_topic_prefix() -> String {
    "frigate".to_string()
}

/// Configuration for the MQTT event source
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// MQTT broker hostname or IP address
    pub broker: String,

    /// MQTT broker port
    #[serde(default = "default_port")]
    pub port: u16,

    /// MQTT client ID
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Frigate topic prefix; events arrive on `<prefix>/events` (default: "frigate")
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    /// Optional username for authentication
    pub username: Option<String>,

    /// Optional password for authentication
    pub password: Option<String>,
}

impl Config {
    pub fn events_topic(&self) -> String {
        format!("{}/events", self.topic_prefix)
    }
}
