//! # Feed Manager
//!
//! Keeps several named feeds together for aggregate health and shutdown.

pub mod manager;

pub use manager::{FeedId, FeedManager};
