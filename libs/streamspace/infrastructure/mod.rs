//! Infrastructure Layer
//!
//! Configuration, logging, REST seeding and process shutdown.

pub mod config;
pub mod logging;
pub mod rest;
pub mod shutdown;

pub use config::{ConfigError, LiveConfig};
pub use logging::{init_tracing, init_tracing_with_level};
pub use rest::{RestError, StreamSpaceRestClient};
pub use shutdown::ShutdownManager;
