//! Backend messaging stack for the Fab-O-Matic access terminal.
//!
//! Provides the resilient client that carries every request to the backend
//! authority: publish, bounded reply wait, fixed retries, and a
//! store-and-forward buffer for records that must survive an outage. The
//! client is generic over a publish/subscribe transport; an in-memory broker
//! double lives here too so the whole stack is testable without a network.

pub mod broker;
pub mod client;
pub mod error;
pub mod transport;

pub use broker::{MockBroker, MockBrokerHandle};
pub use client::{BackendClient, BackendConfig};
pub use error::{BackendError, Result};
pub use transport::PubSubTransport;
