use std::error::Error;

use async_trait::async_trait;

/// A message published on one of the subscribed topics.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Broker connection used by the event source.
#[async_trait]
pub trait MqttClient: Send + Sync {
    async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>>;

    /// Subscribe to `topic` for the lifetime of the client, across reconnects.
    async fn subscribe(&mut self, topic: &str) -> Result<(), Box<dyn Error + Send>>;

    /// Next message on any subscribed topic, or `None` once the client is closed.
    async fn poll_message(&mut self) -> Option<MqttMessage>;
}

/// In-memory client replaying queued messages.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockMqttClient {
    pub messages: std::collections::VecDeque<MqttMessage>,
    pub subscriptions: Vec<String>,
    pub is_connected: bool,
}

#[cfg(test)]
impl MockMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, topic: &str, payload: &[u8]) {
        self.messages.push_back(MqttMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
    }
}

#[cfg(test)]
#[async_trait]
impl MqttClient for MockMqttClient {
    async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        self.is_connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Box<dyn Error + Send>> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn poll_message(&mut self) -> Option<MqttMessage> {
        self.messages.pop_front()
    }
}

#[cfg(feature = "integration_mqtt")]
pub use self::rumqttc_client::RumqttcClient;

#[cfg(feature = "integration_mqtt")]
mod rumqttc_client {
    use std::collections::BTreeSet;
    use std::error::Error;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use rumqttc::AsyncClient;
    use rumqttc::Event;
    use rumqttc::EventLoop;
    use rumqttc::MqttOptions;
    use rumqttc::Packet;
    use rumqttc::QoS;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tracing::debug;
    use tracing::info;
    use tracing::warn;

    use super::MqttClient;
    use super::MqttMessage;
    use crate::integrations::mqtt::MqttConfig;

    /// Frigate events carry full before/after object state.
    const MAX_PACKET_SIZE: usize = 256 * 1024;

    const RECONNECT_DELAY: Duration = Duration::from_secs(1);

    /// Topics subscribed through the client, shared with the event loop task.
    type Topics = Arc<Mutex<BTreeSet<String>>>;

    /// Topics to subscribe again after `event`.
    ///
    /// The client connects with a clean session, so a ConnAck without a
    /// present session means the broker has forgotten every subscription.
    fn lost_subscriptions(event: &Event, topics: &Topics) -> Vec<String> {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) if !ack.session_present => topics
                .lock()
                .map(|topics| topics.iter().cloned().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// MQTT client backed by rumqttc.
    ///
    /// rumqttc reconnects on the next poll after a connection error. The
    /// event loop task restores subscriptions whenever the broker hands back
    /// a fresh session.
    pub struct RumqttcClient {
        options: MqttOptions,
        topics: Topics,
        client: Option<AsyncClient>,
        messages: Option<mpsc::UnboundedReceiver<MqttMessage>>,
        event_loop: Option<JoinHandle<()>>,
    }

    impl RumqttcClient {
        pub fn new(config: &MqttConfig) -> Self {
            let mut options =
                MqttOptions::new(config.client_id.clone(), config.broker.clone(), config.port);
            options.set_keep_alive(Duration::from_secs(30));
            options.set_clean_session(true);
            options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
            if let (Some(username), Some(password)) = (&config.username, &config.password) {
                options.set_credentials(username, password);
            }

            Self {
                options,
                topics: Topics::default(),
                client: None,
                messages: None,
                event_loop: None,
            }
        }

        async fn run_event_loop(
            mut event_loop: EventLoop,
            client: AsyncClient,
            topics: Topics,
            messages: mpsc::UnboundedSender<MqttMessage>,
        ) {
            loop {
                let event = match event_loop.poll().await {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("MQTT connection error: {}", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue;
                    }
                };

                let lost = lost_subscriptions(&event, &topics);
                if !lost.is_empty() {
                    info!("Restoring {} MQTT subscriptions", lost.len());
                    // Subscribing waits on the request queue this loop drains.
                    let client = client.clone();
                    tokio::spawn(async move {
                        for topic in lost {
                            if let Err(e) = client.subscribe(&topic, QoS::AtMostOnce).await {
                                warn!("Failed to restore subscription to {}: {}", topic, e);
                            }
                        }
                    });
                }

                if let Event::Incoming(Packet::Publish(publish)) = event {
                    let msg = MqttMessage {
                        topic: publish.topic.to_string(),
                        payload: publish.payload.to_vec(),
                    };
                    if messages.send(msg).is_err() {
                        break;
                    }
                }
            }
            debug!("MQTT event loop stopped");
        }
    }

    #[async_trait]
    impl MqttClient for RumqttcClient {
        async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>> {
            let (client, event_loop) = AsyncClient::new(self.options.clone(), 10);
            let (tx, rx) = mpsc::unbounded_channel();

            self.event_loop = Some(tokio::spawn(Self::run_event_loop(
                event_loop,
                client.clone(),
                self.topics.clone(),
                tx,
            )));
            self.client = Some(client);
            self.messages = Some(rx);
            Ok(())
        }

        async fn subscribe(&mut self, topic: &str) -> Result<(), Box<dyn Error + Send>> {
            let Some(client) = &self.client else {
                return Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "MQTT client is not connected",
                )));
            };

            if let Ok(mut topics) = self.topics.lock() {
                topics.insert(topic.to_string());
            }
            client
                .subscribe(topic, QoS::AtMostOnce)
                .await
                .map_err(|e| Box::new(e) as Box<dyn Error + Send>)
        }

        async fn poll_message(&mut self) -> Option<MqttMessage> {
            self.messages.as_mut()?.recv().await
        }
    }

    impl Drop for RumqttcClient {
        fn drop(&mut self) {
            if let Some(task) = self.event_loop.take() {
                task.abort();
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use rumqttc::ConnAck;
        use rumqttc::ConnectReturnCode;
        use rumqttc::Outgoing;

        use super::*;

        fn connack(session_present: bool) -> Event {
            Event::Incoming(Packet::ConnAck(ConnAck {
                session_present,
                code: ConnectReturnCode::Success,
            }))
        }

        fn topics(topics: &[&str]) -> Topics {
            Arc::new(Mutex::new(topics.iter().map(|t| t.to_string()).collect()))
        }

        #[test]
        fn test_fresh_session_restores_every_topic() {
            let topics = topics(&["zigbee2mqtt/back_motion", "frigate/events"]);

            assert_eq!(
                lost_subscriptions(&connack(false), &topics),
                vec!["frigate/events", "zigbee2mqtt/back_motion"]
            );
        }

        #[test]
        fn test_resumed_session_keeps_subscriptions() {
            let topics = topics(&["frigate/events"]);
            assert!(lost_subscriptions(&connack(true), &topics).is_empty());
        }

        #[test]
        fn test_other_events_restore_nothing() {
            let topics = topics(&["frigate/events"]);
            assert!(lost_subscriptions(&Event::Incoming(Packet::PingResp), &topics).is_empty());
            assert!(lost_subscriptions(&Event::Outgoing(Outgoing::PingReq), &topics).is_empty());
        }

        #[tokio::test]
        async fn test_subscribe_before_connect_fails() {
            let config: MqttConfig = toml::from_str(r#"broker = "localhost""#).unwrap();
            let mut client = RumqttcClient::new(&config);

            assert!(client.subscribe("frigate/events").await.is_err());
            assert!(client.topics.lock().unwrap().is_empty());
        }
    }
}
