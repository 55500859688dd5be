pub mod aggregate;
pub mod api;
pub mod auth;
pub mod config;
pub mod delta;
pub mod error;
pub mod ingest;
pub mod metrics_server;
pub mod observability;
pub mod registry;
pub mod series;
pub mod store;
pub mod window;

pub use error::CoreError;
pub use registry::{StreamHandle, StreamRegistry};
