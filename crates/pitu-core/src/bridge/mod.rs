//! Real-time shadow bridge between the bus and websocket UI clients.
//!
//! Every client gets its own upstream subscription to the update-accepted
//! topic of every named shadow, a paced replay of current shadow state,
//! and a relay that turns any event it sends into a bus publish.

mod connection;
mod protocol;
mod server;
mod sink;

pub use protocol::{ClientFrame, OutboundEvent};
pub use server::BridgeServer;
pub use sink::ClientSink;
