//! Transport abstraction between the client and a publish/subscribe broker.
//!
//! The client is generic over this trait so the whole messaging stack can be
//! exercised against the in-memory [`MockBroker`](crate::broker::MockBroker)
//! without a network.

#![allow(async_fn_in_trait)]

use crate::error::Result;

/// A connection to a publish/subscribe broker.
pub trait PubSubTransport: Send {
    /// Establish the connection.
    async fn connect(&mut self) -> Result<()>;

    /// Tear down the connection.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether the connection is currently up.
    fn is_connected(&self) -> bool;

    /// Subscribe to a topic.
    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Publish a payload on a topic.
    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;

    /// Await the next inbound message as `(topic, payload)`.
    ///
    /// Pends until a message arrives on a subscribed topic; callers wrap it
    /// in a timeout.
    async fn receive(&mut self) -> Result<(String, String)>;
}
