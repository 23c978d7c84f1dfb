//! StreamSpace Live - Main Library
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables
//! - **streamspace**: Dashboard feeds, tracking and notifications (re-exported from workspace)
//! - **streamsockets**: Reconnecting WebSocket library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use streamspace_live::bin_common::MonitorArgs;
//! use streamspace_live::streamspace::LiveDashboard;
//! ```

// Re-export workspace libraries for convenience
pub use streamsockets;
pub use streamspace;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{MonitorArgs, CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH};
}
