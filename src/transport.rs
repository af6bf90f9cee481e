//! Publish/subscribe transport seam
//!
//! The bridge talks to the broker only through these traits. A connection is
//! split in two halves the way `rumqttc` splits it: a cloneable control handle
//! used to issue requests, and an event source that must be polled on a
//! background task for anything to make progress on the wire.

use std::future::Future;

use bytes::Bytes;
use rumqttc::QoS;
use thiserror::Error;

use crate::client::config::{BridgeSettings, ConnectionParams};
use crate::client::error::ConnectionEstablishmentError;

/// `rumqttc` implementation of the transport traits
pub mod rumqttc_transport;

pub use rumqttc_transport::RumqttcTransport;

/// Errors reported by an established transport
#[derive(Debug, Error)]
pub enum TransportError {
	/// A request could not be handed to the client
	#[error("Client request failed: {0}")]
	Client(#[from] rumqttc::ClientError),

	/// The connection failed while it was being polled
	#[error("Connection failed: {0}")]
	Connection(#[from] rumqttc::ConnectionError),

	/// Broker answered the subscription with a failure code
	#[error("Broker rejected subscription to '{topic}'")]
	SubscriptionRejected {
		/// Topic filter that was rejected
		topic: String,
	},
}

/// Something the event source observed on the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
	/// Inbound PUBLISH
	Message {
		/// Topic the message was published to
		topic: String,
		/// Raw message body
		payload: Bytes,
	},
	/// Broker refused a subscription request
	SubscriptionRejected,
	/// Connection ended in an orderly way (DISCONNECT sent or received)
	Closed,
	/// Any other protocol traffic
	Other,
}

/// Opens connections to a broker.
pub trait Transport: Send + Sync {
	/// Request half of a connection
	type Control: TransportControl;
	/// Event half of a connection
	type Events: TransportEvents;

	/// Connect and wait for the broker to accept the session.
	///
	/// Implementations must bound this call by
	/// [`BridgeSettings::connect_timeout`].
	fn connect(
		&self,
		params: &ConnectionParams,
		settings: &BridgeSettings,
	) -> impl Future<
		Output = Result<
			(Self::Control, Self::Events),
			ConnectionEstablishmentError,
		>,
	> + Send;
}

/// Request half of an established connection.
pub trait TransportControl: Send + Sync + 'static {
	/// Ask the broker for a subscription
	fn subscribe(
		&self,
		topic: &str,
		qos: QoS,
	) -> impl Future<Output = Result<(), TransportError>> + Send;

	/// Drop a subscription
	fn unsubscribe(
		&self,
		topic: &str,
	) -> impl Future<Output = Result<(), TransportError>> + Send;

	/// Send DISCONNECT; the event half reports [`TransportEvent::Closed`]
	/// once it has gone out
	fn disconnect(
		&self,
	) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Event half of an established connection.
pub trait TransportEvents: Send + 'static {
	/// Drive the connection until the next event
	fn next_event(
		&mut self,
	) -> impl Future<Output = Result<TransportEvent, TransportError>> + Send;
}
