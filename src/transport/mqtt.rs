use std::time::Duration;

use bytes::Bytes;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bridge::Publication;
use crate::config::MqttConfig;

const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// An inbound command message handed from the broker task to the worker
/// loop. Scheduler state is only ever touched on the loop side.
#[derive(Debug)]
pub struct CommandMessage {
    pub topic: String,
    pub payload: Bytes,
}

/// Thin shim over the MQTT client: owns the connection task, forwards
/// inbound publishes over a channel, exposes a publish exit point.
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Connects and spawns the connection task. The task re-subscribes the
    /// whole topic list on every connection acknowledgement, so broker
    /// reconnects keep the command topics alive.
    pub fn connect(
        config: &MqttConfig,
        subscriptions: Vec<String>,
        commands: mpsc::Sender<CommandMessage>,
    ) -> Self {
        let mut options = MqttOptions::new("mediola2mqtt", &config.host, config.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);

        let subscriber = client.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(
                            "connected to MQTT broker, subscribing to {} command topics",
                            subscriptions.len()
                        );
                        for topic in &subscriptions {
                            if let Err(e) = subscriber.subscribe(topic, QoS::AtMostOnce).await {
                                warn!("failed to subscribe to {topic}: {e}");
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = CommandMessage {
                            topic: publish.topic,
                            payload: publish.payload,
                        };
                        if commands.send(message).await.is_err() {
                            // worker loop is gone, nothing left to do
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT connection error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self { client }
    }

    pub async fn publish(&self, publication: &Publication) -> Result<(), rumqttc::ClientError> {
        self.client
            .publish(
                publication.topic.as_str(),
                QoS::AtMostOnce,
                publication.retain,
                publication.payload.clone(),
            )
            .await
    }
}
