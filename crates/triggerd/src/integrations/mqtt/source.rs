use std::collections::BTreeSet;
use std::error::Error;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::MqttConfig;
use super::binary_sensor::parse_sensor_state;
use super::client::MqttClient;
use super::client::MqttMessage;
use super::frigate::FrigateEvent;
use crate::config::Config;
use crate::engine::CameraEvent;
use crate::engine::Fidelity;
use crate::engine::TriggersHandle;
use crate::host::ConfigHandle;

#[derive(Debug, thiserror::Error)]
pub enum EventSourceError {
    #[error("Failed to connect to MQTT broker: {0}")]
    Connect(#[source] Box<dyn Error + Send>),

    #[error("Failed to subscribe to {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: Box<dyn Error + Send>,
    },

    #[error("Triggers engine is no longer running")]
    EngineClosed,
}

/// Feeds camera events from MQTT into the triggers engine.
///
/// Frigate events on `<prefix>/events` become high-fidelity events. State
/// topics listed under a camera's `triggers.entities` become low-fidelity
/// events. Topics are subscribed once at startup, while the camera mapping
/// is re-read for every message.
pub struct MqttEventSource<C: MqttClient> {
    client: C,
    mqtt: MqttConfig,
    config: Arc<ConfigHandle>,
    engine: TriggersHandle,
}

impl<C: MqttClient> MqttEventSource<C> {
    pub fn new(
        client: C,
        mqtt: MqttConfig,
        config: Arc<ConfigHandle>,
        engine: TriggersHandle,
    ) -> Self {
        Self {
            client,
            mqtt,
            config,
            engine,
        }
    }

    fn topics(&self) -> BTreeSet<String> {
        let config = self.config.load();
        let mut topics: BTreeSet<String> = config
            .cameras
            .values()
            .flat_map(|camera| camera.triggers.entities.iter().cloned())
            .collect();
        topics.insert(self.mqtt.events_topic());
        topics
    }

    /// Connect, subscribe and forward events until the connection ends.
    pub async fn run(&mut self) -> Result<(), EventSourceError> {
        self.client
            .connect()
            .await
            .map_err(EventSourceError::Connect)?;
        info!("Connected to MQTT broker {}:{}", self.mqtt.broker, self.mqtt.port);

        for topic in self.topics() {
            self.client
                .subscribe(&topic)
                .await
                .map_err(|source| EventSourceError::Subscribe {
                    topic: topic.clone(),
                    source,
                })?;
            debug!("Subscribed to {}", topic);
        }

        while let Some(msg) = self.client.poll_message().await {
            let events = events_for_message(&self.config.load(), &self.mqtt, &msg);
            for event in events {
                debug!("{} event for camera {}", event.kind, event.camera_id);
                self.engine
                    .send_event(event)
                    .await
                    .map_err(|_| EventSourceError::EngineClosed)?;
            }
        }

        info!("MQTT connection closed");
        Ok(())
    }
}

/// Camera events carried by one MQTT message.
///
/// Malformed payloads are logged and produce no events.
pub fn events_for_message(
    config: &Config,
    mqtt: &MqttConfig,
    msg: &MqttMessage,
) -> Vec<CameraEvent> {
    if msg.topic == mqtt.events_topic() {
        return match serde_json::from_slice::<FrigateEvent>(&msg.payload) {
            Ok(event) => event.camera_events(&config.cameras),
            Err(e) => {
                warn!("Ignoring malformed Frigate event: {}", e);
                Vec::new()
            }
        };
    }

    let cameras: Vec<&String> = config
        .cameras
        .iter()
        .filter(|(_, camera)| camera.triggers.entities.contains(&msg.topic))
        .map(|(camera_id, _)| camera_id)
        .collect();
    if cameras.is_empty() {
        return Vec::new();
    }

    let Some(active) = parse_sensor_state(&msg.payload) else {
        warn!("Ignoring sensor payload without a state on {}", msg.topic);
        return Vec::new();
    };

    cameras
        .into_iter()
        .map(|camera_id| {
            if active {
                CameraEvent::start(camera_id.as_str(), Fidelity::Low)
            } else {
                CameraEvent::end(camera_id.as_str(), Fidelity::Low)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::TriggersEngine;
    use crate::host::Host;
    use crate::integrations::mqtt::client::MockMqttClient;

    const CONFIG: &str = r#"
        [cameras.front]
        frigate_camera_name = "front_door"

        [cameras.back]
        triggers.entities = ["zigbee2mqtt/back_motion"]

        [cameras.side]
        triggers.entities = ["zigbee2mqtt/back_motion"]

        [mqtt]
        broker = "localhost"
    "#;

    fn config() -> (Config, MqttConfig) {
        let config = Config::parse(CONFIG).unwrap();
        let mqtt = config.mqtt.clone().unwrap();
        (config, mqtt)
    }

    fn message(topic: &str, payload: &[u8]) -> MqttMessage {
        MqttMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn test_frigate_message() {
        let (config, mqtt) = config();
        let payload = br#"{"type": "new", "after": {"camera": "front_door", "has_snapshot": true}}"#;

        let events = events_for_message(&config, &mqtt, &message("frigate/events", payload));
        assert_eq!(
            events,
            vec![CameraEvent::start("front", Fidelity::High).with_snapshot(true)]
        );
    }

    #[test]
    fn test_sensor_message_fans_out() {
        let (config, mqtt) = config();

        let msg = message("zigbee2mqtt/back_motion", br#"{"occupancy": false}"#);
        assert_eq!(
            events_for_message(&config, &mqtt, &msg),
            vec![
                CameraEvent::end("back", Fidelity::Low),
                CameraEvent::end("side", Fidelity::Low),
            ]
        );
    }

    #[test]
    fn test_ignored_messages() {
        let (config, mqtt) = config();

        let malformed = message("frigate/events", b"{not json");
        assert!(events_for_message(&config, &mqtt, &malformed).is_empty());

        let stateless = message("zigbee2mqtt/back_motion", br#"{"battery": 90}"#);
        assert!(events_for_message(&config, &mqtt, &stateless).is_empty());

        let unrelated = message("zigbee2mqtt/kitchen_motion", b"ON");
        assert!(events_for_message(&config, &mqtt, &unrelated).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forwards_events() {
        let (config, mqtt) = config();
        let host = Host::new(config);
        let (engine, handle) = TriggersEngine::new(host.capabilities());
        tokio::spawn(engine.run());

        let mut client = MockMqttClient::new();
        client.add_message(
            "frigate/events",
            br#"{"type": "new", "after": {"camera": "front_door"}}"#,
        );
        client.add_message("frigate/events", b"garbage");
        client.add_message("zigbee2mqtt/back_motion", b"ON");

        let mut source = MqttEventSource::new(client, mqtt, host.config.clone(), handle.clone());
        source.run().await.unwrap();

        assert!(source.client.is_connected);
        assert_eq!(
            source.client.subscriptions,
            vec!["frigate/events", "zigbee2mqtt/back_motion"]
        );

        // Let the engine drain its queue.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let expected: BTreeSet<String> = ["back", "front", "side"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(handle.triggered_camera_ids(), expected);
    }
}
