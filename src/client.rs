//! Subscribe-once client module
//!
//! This module provides the bounded subscribe-and-wait bridge together with
//! its configuration and error types.

/// Subscribe-once bridge
pub mod bridge;
pub mod config;
/// Client error types
pub mod error;

// Re-export commonly used types for convenience
pub use bridge::{SubscribeOnce, subscribe_once, subscribe_once_blocking};
pub use config::{BridgeSettings, ConnectionParams};
pub use error::{BridgeError, ConnectionEstablishmentError};

// Session type is available from the root level
// Use: mqtt_subscribe_once::Session
