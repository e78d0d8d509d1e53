//! Resilient messaging client for the backend authority.
//!
//! Each machine owns one topic (`/machine/<name>`) for requests and one
//! reply sub-topic (`/machine/<name>/reply`) for answers. The client
//! publishes a request, waits a bounded time for the reply, and retries a
//! fixed number of times before giving up. Record-carrying requests that
//! cannot be delivered are parked in a bounded buffer and retransmitted,
//! oldest first, once the backend is reachable again, so no usage record is
//! lost to an outage shorter than the buffer.
//!
//! The client is generic over [`PubSubTransport`], so every delivery path
//! can be tested against the in-memory broker.

use std::time::Duration;

use fabomatic_core::CardUid;
use fabomatic_core::constants::{MAX_TRIES, RESPONSE_TOPIC, TIMEOUT_REPLY, TOPIC_PREFIX};
use fabomatic_protocol::{
    BufferedMsg, MachineResponse, MessageBuffer, Query, Response, SimpleResponse, UserResponse,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{BackendError, Result};
use crate::transport::PubSubTransport;

/// Connection settings for the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Broker hostname or address.
    pub broker_host: String,
    /// Machine name, used as the topic suffix.
    pub machine_name: String,
}

impl BackendConfig {
    /// Topic this machine publishes requests on.
    #[must_use]
    pub fn machine_topic(&self) -> String {
        format!("{TOPIC_PREFIX}/{}", self.machine_name)
    }

    /// Topic this machine receives replies on.
    #[must_use]
    pub fn reply_topic(&self) -> String {
        format!("{}{RESPONSE_TOPIC}", self.machine_topic())
    }
}

/// Messaging client. Owns the transport and the store-and-forward buffer.
pub struct BackendClient<T: PubSubTransport> {
    transport: T,
    config: Option<BackendConfig>,
    topic: String,
    reply_topic: String,
    online: bool,
    buffer: MessageBuffer,
}

impl<T: PubSubTransport> BackendClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: None,
            topic: String::new(),
            reply_topic: String::new(),
            online: false,
            buffer: MessageBuffer::new(),
        }
    }

    /// Install or replace the connection settings.
    ///
    /// Calling this again fully replaces the previous settings; the next
    /// [`connect`](Self::connect) uses the new topics.
    pub fn configure(&mut self, config: BackendConfig) {
        self.topic = config.machine_topic();
        self.reply_topic = config.reply_topic();
        info!(topic = %self.topic, host = %config.broker_host, "backend configured");
        self.config = Some(config);
        self.online = false;
    }

    /// Connect the transport and subscribe to the reply topic.
    ///
    /// # Errors
    /// Returns an error if the client is unconfigured or the broker is
    /// unreachable; the client stays offline in that case.
    pub async fn connect(&mut self) -> Result<()> {
        if self.config.is_none() {
            return Err(BackendError::NotConfigured);
        }
        self.online = false;
        self.transport.connect().await?;
        self.transport.subscribe(&self.reply_topic).await?;
        self.online = true;
        info!(topic = %self.topic, "backend connected");
        Ok(())
    }

    /// Disconnect the transport.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.online = false;
        self.transport.disconnect().await
    }

    /// Whether the last transport interaction succeeded.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Ask the backend about a card.
    pub async fn check_card(&mut self, uid: CardUid) -> Result<UserResponse> {
        self.publish_with_reply(&Query::CheckUser { uid }).await
    }

    /// Fetch the machine policy.
    pub async fn check_machine(&mut self) -> Result<MachineResponse> {
        self.publish_with_reply(&Query::CheckMachine).await
    }

    /// Record a session start.
    pub async fn start_use(&mut self, uid: CardUid) -> Result<SimpleResponse> {
        self.publish_with_reply(&Query::StartUse { uid }).await
    }

    /// Periodic in-session notification.
    pub async fn in_use(&mut self, uid: CardUid, duration: Duration) -> Result<SimpleResponse> {
        self.publish_with_reply(&Query::InUse {
            uid,
            duration: duration.as_secs(),
        })
        .await
    }

    /// Record a session end with its total duration.
    pub async fn finish_use(&mut self, uid: CardUid, duration: Duration) -> Result<SimpleResponse> {
        self.publish_with_reply(&Query::StopUse {
            uid,
            duration: duration.as_secs(),
        })
        .await
    }

    /// Record a completed maintenance intervention.
    pub async fn register_maintenance(&mut self, uid: CardUid) -> Result<SimpleResponse> {
        self.publish_with_reply(&Query::Maintenance { uid }).await
    }

    /// Fire-and-forget presence announcement.
    pub async fn alive(&mut self, version: &str, ip: &str, serial: &str, heap: u64) -> Result<()> {
        let query = Query::Alive {
            version: version.to_string(),
            ip: ip.to_string(),
            serial: serial.to_string(),
            heap,
        };
        let payload = query.payload()?;
        if !self.ensure_online().await {
            return Err(BackendError::NotConnected);
        }
        if !self.buffer.is_empty() {
            self.flush_buffer().await;
            if !self.buffer.is_empty() {
                return Err(BackendError::NotConnected);
            }
        }
        if let Err(err) = self.transport.publish(&self.topic, &payload).await {
            self.online = false;
            return Err(err);
        }
        Ok(())
    }

    /// Publish a request and wait for its typed reply.
    ///
    /// Delivery failures never surface as errors: a request the backend did
    /// not answer comes back as [`Response::failed`], and record-carrying
    /// requests are buffered for retransmission first. Only local problems
    /// (unconfigured client, unencodable request) are errors.
    pub async fn publish_with_reply<R: Response>(&mut self, query: &Query) -> Result<R> {
        if self.config.is_none() {
            return Err(BackendError::NotConfigured);
        }
        let payload = query.payload()?;

        if !self.ensure_online().await {
            self.park_if_bufferable(query, payload);
            return Ok(R::failed());
        }

        // Drain the backlog first so the server sees events in causal order.
        // A partial flush leaves older records queued; the new request must
        // not overtake them.
        if !self.buffer.is_empty() {
            self.flush_buffer().await;
            if !self.buffer.is_empty() {
                self.park_if_bufferable(query, payload);
                return Ok(R::failed());
            }
        }

        for attempt in 1..=MAX_TRIES {
            debug!(topic = %self.topic, attempt, %payload, "publishing query");
            if let Err(err) = self.transport.publish(&self.topic, &payload).await {
                warn!(%err, "publish failed, going offline");
                self.online = false;
                break;
            }
            match self.wait_for_reply().await {
                Some(reply) => return Ok(R::from_payload(&reply)),
                None => {
                    warn!(attempt, max = MAX_TRIES, "no reply within window");
                }
            }
            if !self.online {
                break;
            }
        }

        self.park_if_bufferable(query, payload);
        Ok(R::failed())
    }

    /// Publish a raw payload on an arbitrary topic, outside the
    /// request/reply protocol. Used for message-based power switches.
    ///
    /// # Errors
    /// Returns an error when the broker is unreachable; the caller owns the
    /// retry policy.
    pub async fn publish_raw(&mut self, topic: &str, payload: &str) -> Result<()> {
        if !self.ensure_online().await {
            return Err(BackendError::NotConnected);
        }
        if let Err(err) = self.transport.publish(topic, payload).await {
            self.online = false;
            return Err(err);
        }
        Ok(())
    }

    /// Retransmit parked messages, oldest first.
    ///
    /// Stops at the first delivery failure; the failed message goes back to
    /// the front of the queue. Returns how many messages went out.
    pub async fn flush_buffer(&mut self) -> usize {
        let mut sent = 0;
        while let Some(msg) = self.buffer.pop_front() {
            debug!(topic = %msg.topic, "retransmitting buffered message");
            if let Err(err) = self.transport.publish(&msg.topic, &msg.payload).await {
                warn!(%err, "retransmission failed, keeping message");
                self.online = false;
                self.buffer.push_front(msg);
                break;
            }
            if msg.wait_for_reply {
                // The original sender is long gone; the reply only tells us
                // the record was accepted.
                if self.wait_for_reply().await.is_none() {
                    self.buffer.push_front(msg);
                    break;
                }
            }
            sent += 1;
        }
        if sent > 0 {
            info!(sent, remaining = self.buffer.len(), "buffer flushed");
        }
        sent
    }

    /// Number of messages awaiting retransmission.
    #[must_use]
    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer changed since the last snapshot.
    #[must_use]
    pub fn buffer_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }

    /// Snapshot the buffer for persistence and mark it clean.
    ///
    /// # Errors
    /// Returns a `serde_json` error if encoding fails.
    pub fn buffer_snapshot(&mut self) -> Result<String> {
        let json = self.buffer.to_json()?;
        self.buffer.mark_saved();
        Ok(json)
    }

    /// Restore a persisted buffer snapshot. Returns `false` when the
    /// snapshot is invalid and the buffer is left empty.
    pub fn restore_buffer(&mut self, json: &str) -> bool {
        match MessageBuffer::from_json(json) {
            Some(buffer) => {
                info!(count = buffer.len(), "restored buffered messages");
                self.buffer = buffer;
                true
            }
            None => false,
        }
    }

    /// Try to get online, reconnecting once if needed.
    async fn ensure_online(&mut self) -> bool {
        if self.online && self.transport.is_connected() {
            return true;
        }
        match self.connect().await {
            Ok(()) => true,
            Err(err) => {
                debug!(%err, "reconnect failed");
                false
            }
        }
    }

    /// Wait up to the reply window for a message on the reply topic.
    async fn wait_for_reply(&mut self) -> Option<String> {
        let deadline = Instant::now() + TIMEOUT_REPLY;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match tokio::time::timeout(remaining, self.transport.receive()).await {
                Err(_) => return None,
                Ok(Err(err)) => {
                    warn!(%err, "receive failed, going offline");
                    self.online = false;
                    return None;
                }
                Ok(Ok((topic, payload))) => {
                    if topic == self.reply_topic {
                        return Some(payload);
                    }
                    debug!(%topic, "ignoring message on foreign topic");
                }
            }
        }
    }

    fn park_if_bufferable(&mut self, query: &Query, payload: String) {
        if query.bufferable() {
            warn!(topic = %self.topic, "backend unreachable, buffering message");
            self.buffer
                .push_back(BufferedMsg::new(payload, self.topic.clone(), query.wait_for_reply()));
        }
    }
}
