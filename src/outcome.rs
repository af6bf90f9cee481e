//! Result of one subscribe-once invocation

use std::fmt;

use serde::Serialize;

use crate::client::error::BridgeError;
use crate::payload::Payload;

/// What a single invocation produced. Exactly one per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Outcome {
	/// First message that arrived on the subscribed topic
	Success(Payload),
	/// No message arrived before the deadline
	Timeout,
	/// Connecting, subscribing or polling the connection failed
	ConnectionError(String),
}

impl Outcome {
	/// Payload of a successful invocation
	pub fn payload(&self) -> Option<&Payload> {
		match self {
			| Outcome::Success(payload) => Some(payload),
			| _ => None,
		}
	}

	/// Whether a message was received
	pub fn is_success(&self) -> bool {
		matches!(self, Outcome::Success(_))
	}

	/// Terminal phase the invocation reached before closing
	pub fn phase(&self) -> Phase {
		match self {
			| Outcome::Success(_) => Phase::Received,
			| Outcome::Timeout => Phase::TimedOut,
			| Outcome::ConnectionError(_) => Phase::Errored,
		}
	}
}

impl From<BridgeError> for Outcome {
	fn from(err: BridgeError) -> Self {
		Outcome::ConnectionError(err.to_string())
	}
}

/// Lifecycle of one invocation.
///
/// `Idle → Connecting → Waiting → {Received | TimedOut | Errored} → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// Nothing started yet
	Idle,
	/// Connecting to the broker
	Connecting,
	/// Subscribed and waiting for the first message
	Waiting,
	/// A message was handed over
	Received,
	/// The deadline elapsed
	TimedOut,
	/// Something failed
	Errored,
	/// Subscription and connection released
	Closed,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			| Phase::Idle => "idle",
			| Phase::Connecting => "connecting",
			| Phase::Waiting => "waiting",
			| Phase::Received => "received",
			| Phase::TimedOut => "timed_out",
			| Phase::Errored => "errored",
			| Phase::Closed => "closed",
		};
		f.write_str(name)
	}
}
