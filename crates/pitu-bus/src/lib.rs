// pitu-bus: bus session contract and in-process broker for the edge gateway

pub mod error;
pub mod local;
pub mod message;
pub mod session;
pub mod shadow;
pub mod subscription;
pub mod topic;

pub use error::Error;
pub use local::LocalBus;
pub use message::{BusEvent, BusMessage, Encoding, Payload};
pub use session::BusSession;
pub use shadow::{ShadowPage, list_all_shadows};
pub use subscription::Subscription;
pub use topic::TopicFilter;
