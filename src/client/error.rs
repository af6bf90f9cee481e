use crate::transport::TransportError;

/// Errors raised while bringing a connection up to the CONNACK
#[derive(Debug, thiserror::Error)]
pub enum ConnectionEstablishmentError {
    #[error("Network connection to {broker} failed: {source}")]
    Network {
        broker: String,
        #[source]
        source: rumqttc::ConnectionError,
    },

    #[error("Broker {broker} rejected connection: {code:?}")]
    BrokerRejected {
        broker: String,
        code: rumqttc::ConnectReturnCode,
    },

    #[error("Connection to {broker} timed out after {timeout_millis}ms")]
    Timeout { broker: String, timeout_millis: u64 },

    #[error("Invalid client identifier '{client_id}'")]
    InvalidClientId { client_id: String },
}

/// Errors that can occur inside one subscribe-once invocation
///
/// None of these reach the caller of the bridge: they are folded into
/// [`Outcome::ConnectionError`](crate::Outcome::ConnectionError) at the
/// bridge boundary.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Connection establishment failed
    #[error("Failed to establish connection: {0}")]
    ConnectionEstablishment(#[from] ConnectionEstablishmentError),

    /// Request or event loop failure after the connection was up
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The runtime backing the blocking entry point could not be built
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// Thread hosting a blocking call from inside a runtime panicked
    #[error("Blocking call thread panicked")]
    BlockingThreadPanicked,

    /// Background worker ended without handing over a result
    #[error("Background worker stopped before delivering a result")]
    WorkerLost,
}
