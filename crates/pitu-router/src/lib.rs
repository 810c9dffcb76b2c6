// pitu-router: Async client for the cellular router's web API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::RouterClient;
pub use error::Error;
pub use models::RouterStatus;
pub use transport::TransportConfig;
