use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bridge::{Bridge, Origin, Publication};
use crate::config::Config;
use crate::mediola::frame::{Frame, FrameKind};
use crate::poll::{PollKind, PollScheduler};
use crate::registry::DeviceRegistry;
use crate::transport::hub::HubClient;
use crate::transport::mqtt::MqttTransport;

mod bridge;
mod config;
mod mediola;
mod poll;
mod registry;
mod transport;

#[derive(Parser, Debug)]
#[command(version, about = "Bridge a Mediola gateway to an MQTT broker")]
struct Args {
    /// Configuration file; defaults to /config/mediola2mqtt.yaml, then
    /// ./mediola2mqtt.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, config_path) = Config::load(args.config.as_deref())?;
    init_tracing(config.mqtt.debug);
    info!("loaded configuration from {}", config_path.display());

    let bridge = Bridge::new(DeviceRegistry::from_config(&config));
    let hub = HubClient::new(&config.mediola.host)?;

    let (command_tx, mut command_rx) = mpsc::channel(16);
    let mqtt = MqttTransport::connect(
        &config.mqtt,
        bridge.registry().subscriptions(),
        command_tx,
    );

    for document in bridge.registry().discovery_documents()? {
        mqtt.publish(&document)
            .await
            .with_context(|| format!("failed to announce {}", document.topic))?;
    }

    let socket = UdpSocket::bind(("0.0.0.0", config.mediola.udp_port))
        .await
        .with_context(|| format!("failed to bind UDP port {}", config.mediola.udp_port))?;
    info!(
        "listening for gateway events on UDP port {}",
        config.mediola.udp_port
    );

    let mut scheduler = PollScheduler::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut buf = [0u8; 1024];

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = match received {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("UDP receive failed: {e}");
                        continue;
                    }
                };
                let frame = match Frame::classify(&buf[..len]) {
                    Ok(frame) if frame.kind == FrameKind::Event => frame,
                    _ => {
                        warn!(
                            "received something else than an event from {peer}: {:?}",
                            String::from_utf8_lossy(&buf[..len])
                        );
                        continue;
                    }
                };
                process_frame(&bridge, &mqtt, &config, &frame, Origin::Event).await;
            }

            command = command_rx.recv() => {
                // the sender lives in the MQTT task, which never drops it
                let Some(command) = command else { break };
                info!(
                    "command on {}: {}",
                    command.topic,
                    String::from_utf8_lossy(&command.payload)
                );
                if let Some(request) = bridge.handle_command(&command.topic, &command.payload) {
                    if let Err(e) = hub.send_command(&request).await {
                        error!("failed to send {} command: {e}", request.device_type);
                    }
                    // poll for the settling actuator even if the send failed
                    scheduler.note_action(Instant::now());
                }
            }

            _ = ticker.tick() => {
                let Some(kind) = scheduler.on_tick(Instant::now()) else { continue };
                match kind {
                    PollKind::Scheduled => info!("refreshing after refresh timeout"),
                    PollKind::AfterAction => info!("refreshing after action"),
                }
                let body = match hub.get_states().await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("failed to get states: {e}");
                        continue;
                    }
                };
                match Frame::classify(&body) {
                    Ok(frame) if frame.kind == FrameKind::PollReply => {
                        process_frame(&bridge, &mqtt, &config, &frame, Origin::Refresh).await;
                    }
                    _ => warn!(
                        "unexpected poll reply: {:?}",
                        String::from_utf8_lossy(&body)
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Shared decode path for live events and poll replies.
async fn process_frame(
    bridge: &Bridge,
    mqtt: &MqttTransport,
    config: &Config,
    frame: &Frame,
    origin: Origin,
) {
    if config.mqtt.debug {
        debug!("frame payload: {}", String::from_utf8_lossy(&frame.payload));
        // mirror the raw payload for protocol debugging
        let mirror = Publication {
            topic: config.mqtt.topic.clone(),
            payload: frame.payload.clone(),
            retain: false,
        };
        if let Err(e) = mqtt.publish(&mirror).await {
            warn!("failed to mirror frame: {e}");
        }
    }

    let records = match frame.records() {
        Ok(records) => records,
        Err(e) => {
            warn!("couldn't load frame payload as JSON: {e}");
            return;
        }
    };

    for publication in bridge.handle_records(&records, origin) {
        if let Err(e) = mqtt.publish(&publication).await {
            error!("MQTT publish to {} failed: {e}", publication.topic);
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "info,mediola2mqtt=debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
