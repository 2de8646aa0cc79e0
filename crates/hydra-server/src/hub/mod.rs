//! Realtime publish/subscribe hub.
//!
//! Holds the live connection table, the channel subscription table, and
//! per-channel replay buffers. Fan-out is independent per connection: each
//! connection owns a bounded outbound queue, and a slow consumer only ever
//! loses its own frames.

pub mod connection;
pub mod hub;
pub mod replay;


pub use connection::{ClientConnection, ConnectionId};
pub use hub::{DEFAULT_QUEUE_CAPACITY, RealtimeHub};
