//! MQTT session with the `Online` / `Offline` presence contract.

mod topics;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bon::Builder;
use rumqttc::{
    AsyncClient,
    ClientError,
    ConnectionError,
    Event,
    EventLoop,
    LastWill,
    MqttOptions,
    Outgoing,
    Packet,
    QoS,
};
use thiserror::Error;
use tokio::{task::JoinHandle, time::timeout};

pub use self::topics::Topics;
use crate::{poll::SnapshotSink, prelude::*};

const ONLINE: &str = "Online";
const OFFLINE: &str = "Offline";

const QOS: QoS = QoS::AtMostOnce;

const REQUEST_CAPACITY: usize = 16;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to connect to the broker: {0}")]
    ConnectFailed(#[from] ConnectionError),

    #[error("failed to publish: {0}")]
    PublishFailed(#[from] ClientError),

    #[error("the broker session is down")]
    NotConnected,

    #[error("failed to serialize the snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Broker endpoint and connection settings.
#[derive(Builder)]
pub struct Broker {
    #[builder(into)]
    address: String,

    port: u16,

    #[builder(into)]
    client_id: String,

    username: Option<String>,
    password: Option<String>,

    #[builder(default = Duration::from_secs(60))]
    keep_alive: Duration,
}

impl Broker {
    /// Build the connection options with the last will registered.
    ///
    /// The will travels inside the CONNECT packet, so the broker knows it before
    /// the handshake completes.
    fn options(&self, topics: &Topics) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.address, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_last_will(LastWill::new(&topics.presence, OFFLINE, QOS, true));
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        options
    }
}

pub struct Publisher {
    client: AsyncClient,
    topics: Topics,
    is_connected: Arc<AtomicBool>,
    driver: JoinHandle<()>,
}

impl Publisher {
    /// Connect, wait for the broker to accept, and announce the presence.
    #[instrument(skip_all, fields(address = %broker.address, port = broker.port))]
    pub async fn connect(broker: &Broker, topics: Topics) -> Result<Self, PublishError> {
        info!("connecting…");
        let (client, mut event_loop) =
            AsyncClient::new(broker.options(&topics), REQUEST_CAPACITY);
        loop {
            if let Event::Incoming(Packet::ConnAck(ack)) = event_loop.poll().await? {
                info!(?ack.code, "connected");
                break;
            }
        }
        client.publish(&topics.presence, QOS, true, ONLINE).await?;
        let is_connected = Arc::new(AtomicBool::new(true));
        let driver = tokio::spawn(drive(
            event_loop,
            client.clone(),
            topics.presence.clone(),
            Arc::clone(&is_connected),
        ));
        Ok(Self { client, topics, is_connected, driver })
    }

    #[must_use]
    pub const fn topics(&self) -> &Topics {
        &self.topics
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Relaxed)
    }

    /// Announce `Offline` and disconnect cleanly.
    ///
    /// A clean disconnect discards the will, hence the explicit announcement.
    /// While the session is down, the broker has already published the will.
    #[instrument(skip_all)]
    pub async fn disconnect(self) -> Result<(), PublishError> {
        if !self.is_connected() {
            warn!("the session is down, leaving the presence to the last will");
            self.driver.abort();
            return Ok(());
        }
        info!("disconnecting…");
        let requests = async {
            self.client.publish(&self.topics.presence, QOS, true, OFFLINE).await?;
            self.client.disconnect().await
        };
        match timeout(DISCONNECT_TIMEOUT, requests).await {
            Ok(result) => result?,
            Err(_) => warn!("timed out while disconnecting"),
        }
        let abort_handle = self.driver.abort_handle();
        if timeout(DISCONNECT_TIMEOUT, self.driver).await.is_err() {
            warn!("the event loop did not stop in time");
            abort_handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotSink for Publisher {
    /// Enqueue the payload without waiting: a cycle fails instead of piling up stale prices.
    async fn publish_payload(&self, payload: String) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.client.try_publish(&self.topics.data, QOS, false, payload)?;
        Ok(())
    }
}

/// Drive the network I/O until the client disconnects.
///
/// Polling again after an error makes the event loop reconnect, with the will
/// resent in every CONNECT. Presence is re-announced on every reconnection.
async fn drive(
    mut event_loop: EventLoop,
    client: AsyncClient,
    presence: String,
    is_connected: Arc<AtomicBool>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(?ack.code, "reconnected");
                is_connected.store(true, Ordering::Relaxed);

                // The driver must keep polling for this request to get through.
                let client = client.clone();
                let presence = presence.clone();
                tokio::spawn(async move {
                    if let Err(error) = client.publish(presence, QOS, true, ONLINE).await {
                        warn!("failed to announce the presence: {error:#}");
                    }
                });
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("disconnected");
                break;
            }
            Ok(event) => {
                trace!(?event);
            }
            Err(error) => {
                is_connected.store(false, Ordering::Relaxed);
                error!("connection error: {error:#}");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
