//! # MQTT Subscribe Once
//!
//! Connect to an MQTT broker, subscribe to one topic, wait a bounded time for
//! the first message, disconnect, and return exactly one result.
//!
//! ## Features
//!
//! - **Single result**: every call yields one [`Outcome`]: the first message,
//!   a timeout, or a connection error. Later messages are ignored.
//! - **Bounded**: connecting, waiting and teardown each have a deadline.
//! - **Scoped resources**: the connection, subscription and background event
//!   loop belong to one call and are released on every exit path.
//! - **Graceful decoding**: JSON objects of scalar fields become a
//!   [`Payload::Structured`] map, anything else is kept as text.
//! - **Sync or async**: [`subscribe_once`] for `tokio` callers,
//!   [`subscribe_once_blocking`] for everyone else.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use mqtt_subscribe_once::{ConnectionParams, Outcome, subscribe_once_blocking};
//!
//! let params = ConnectionParams::new(
//!     "broker.mqttdashboard.com",
//!     1883,
//!     "sensor_st",
//!     "reader_1",
//! );
//!
//! match subscribe_once_blocking(&params, Duration::from_secs(5)) {
//!     Outcome::Success(payload) => {
//!         if let Some(temp) = payload.get("temp") {
//!             println!("temperature: {temp}");
//!         } else {
//!             println!("{payload}");
//!         }
//!     }
//!     Outcome::Timeout => println!("no reading within 5s"),
//!     Outcome::ConnectionError(message) => eprintln!("connection error: {message}"),
//! }
//! ```
//!
//! ## Custom Transport
//!
//! The bridge only talks to the broker through the [`transport`] traits.
//! [`RumqttcTransport`] is used by default; any other implementation can be
//! plugged in with [`SubscribeOnce::with_transport`].

#![warn(missing_docs)]

// Core modules
pub mod client;
pub mod connection;
/// Outcome of a single invocation
pub mod outcome;
/// Message body decoding
pub mod payload;
pub mod topic;
pub mod transport;

// === Core Public API ===
pub use client::{
	BridgeSettings, ConnectionParams, SubscribeOnce, subscribe_once,
	subscribe_once_blocking,
};
pub use connection::Session;
pub use outcome::{Outcome, Phase};
pub use payload::Payload;
// Essential external types
pub use rumqttc::QoS;
// === Advanced API ===
pub use topic::TopicFilter;
pub use transport::{
	RumqttcTransport, Transport, TransportControl, TransportEvent,
	TransportEvents,
};

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_subscribe_once::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for most applications

	pub use crate::{
		BridgeSettings, ConnectionParams, Outcome, Payload, QoS,
		SubscribeOnce, subscribe_once, subscribe_once_blocking,
	};
}

/// Error types used throughout the library
///
/// ```rust
/// use mqtt_subscribe_once::errors::*;
/// ```
pub mod errors {
	//! All error types used in the library

	pub use crate::client::{BridgeError, ConnectionEstablishmentError};
	pub use crate::transport::TransportError;
}
