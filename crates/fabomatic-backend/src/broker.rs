//! In-memory broker double for testing the messaging stack.
//!
//! Behaves like a tiny publish/subscribe broker with a scripted server
//! behind it: a test installs a responder closure that inspects each
//! published request and (optionally) produces the reply the broker then
//! delivers on the machine's reply sub-topic. The handle can also cut the
//! broker off entirely to simulate an outage.

use std::sync::Arc;

use fabomatic_core::constants::RESPONSE_TOPIC;
use tokio::sync::{Mutex, mpsc};

use crate::error::{BackendError, Result};
use crate::transport::PubSubTransport;

/// Scripted server: `(topic, payload) -> Option<reply payload>`.
pub type Responder = Box<dyn FnMut(&str, &str) -> Option<String> + Send>;

struct BrokerState {
    reachable: bool,
    responder: Option<Responder>,
    published: Vec<(String, String)>,
    subscriptions: Vec<String>,
    inbound_tx: mpsc::UnboundedSender<(String, String)>,
}

/// Transport side of the broker double, handed to the client.
pub struct MockBroker {
    state: Arc<Mutex<BrokerState>>,
    inbound_rx: mpsc::UnboundedReceiver<(String, String)>,
    connected: bool,
}

/// Test side of the broker double.
#[derive(Clone)]
pub struct MockBrokerHandle {
    state: Arc<Mutex<BrokerState>>,
}

impl MockBroker {
    /// Create a broker/handle pair. The broker starts reachable.
    pub fn new() -> (Self, MockBrokerHandle) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(BrokerState {
            reachable: true,
            responder: None,
            published: Vec::new(),
            subscriptions: Vec::new(),
            inbound_tx,
        }));
        (
            Self {
                state: Arc::clone(&state),
                inbound_rx,
                connected: false,
            },
            MockBrokerHandle { state },
        )
    }
}

impl PubSubTransport for MockBroker {
    async fn connect(&mut self) -> Result<()> {
        if !self.state.lock().await.reachable {
            self.connected = false;
            return Err(BackendError::transport("broker unreachable"));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        if !self.connected {
            return Err(BackendError::NotConnected);
        }
        self.state.lock().await.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !self.connected || !state.reachable {
            self.connected = false;
            return Err(BackendError::transport("broker unreachable"));
        }
        state
            .published
            .push((topic.to_string(), payload.to_string()));

        let reply = match state.responder.as_mut() {
            Some(responder) => responder(topic, payload),
            None => None,
        };
        if let Some(reply) = reply {
            let reply_topic = format!("{topic}{RESPONSE_TOPIC}");
            if state.subscriptions.iter().any(|s| *s == reply_topic) {
                let _ = state.inbound_tx.send((reply_topic, reply));
            }
        }
        Ok(())
    }

    async fn receive(&mut self) -> Result<(String, String)> {
        self.inbound_rx
            .recv()
            .await
            .ok_or_else(|| BackendError::transport("broker channel closed"))
    }
}

impl MockBrokerHandle {
    /// Make the broker reachable or not. An unreachable broker fails every
    /// connect and publish until restored.
    pub async fn set_reachable(&self, reachable: bool) {
        self.state.lock().await.reachable = reachable;
    }

    /// Install the scripted server.
    pub async fn set_responder(
        &self,
        responder: impl FnMut(&str, &str) -> Option<String> + Send + 'static,
    ) {
        self.state.lock().await.responder = Some(Box::new(responder));
    }

    /// Deliver an unsolicited message to a subscribed topic.
    pub async fn inject(&self, topic: &str, payload: &str) {
        let state = self.state.lock().await;
        if state.subscriptions.iter().any(|s| s == topic) {
            let _ = state.inbound_tx.send((topic.to_string(), payload.to_string()));
        }
    }

    /// Everything published so far, in order.
    pub async fn published(&self) -> Vec<(String, String)> {
        self.state.lock().await.published.clone()
    }

    /// Forget recorded publishes.
    pub async fn clear_published(&self) {
        self.state.lock().await.published.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responder_replies_on_reply_topic() {
        let (mut broker, handle) = MockBroker::new();
        handle
            .set_responder(|_topic, _payload| Some(r#"{"request_ok":true}"#.to_string()))
            .await;

        broker.connect().await.unwrap();
        broker.subscribe("/machine/m1/reply").await.unwrap();
        broker.publish("/machine/m1", r#"{"action":"checkmachine"}"#).await.unwrap();

        let (topic, payload) = broker.receive().await.unwrap();
        assert_eq!(topic, "/machine/m1/reply");
        assert_eq!(payload, r#"{"request_ok":true}"#);
    }

    #[tokio::test]
    async fn test_unreachable_broker_fails_publish() {
        let (mut broker, handle) = MockBroker::new();
        broker.connect().await.unwrap();
        handle.set_reachable(false).await;
        assert!(broker.publish("/machine/m1", "{}").await.is_err());
        assert!(!broker.is_connected());
    }
}
