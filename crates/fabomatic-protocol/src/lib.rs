//! Wire protocol between the board and the backend authority.
//!
//! Requests are single JSON objects tagged by an `action` field, published on
//! a per-machine topic; replies are single JSON objects received on the
//! machine's reply sub-topic. This crate owns the typed queries, the typed
//! responses, and the bounded buffer of undelivered messages that survives a
//! reboot.

pub mod buffer;
pub mod queries;
pub mod responses;

pub use buffer::{BufferedMsg, MessageBuffer};
pub use queries::Query;
pub use responses::{MachineResponse, Response, SimpleResponse, UserResponse};
