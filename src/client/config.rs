//! Configuration for a single subscribe-once invocation

use std::time::Duration;

use rumqttc::{MqttOptions, OptionError, QoS};

/// Broker used when none is configured
pub const DEFAULT_BROKER: &str = "broker.mqttdashboard.com";
/// Plain MQTT port
pub const DEFAULT_PORT: u16 = 1883;
/// Topic used when none is configured
pub const DEFAULT_TOPIC: &str = "sensor_st";
/// Client identifier used when none is configured
pub const DEFAULT_CLIENT_ID: &str = "mqtt_read_client";
/// How long to wait for the first message once subscribed
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where to connect and what to listen to.
///
/// Supplied fresh for every invocation; nothing here is validated beyond
/// what the underlying MQTT client checks on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Broker host name or IP address
    pub broker: String,
    /// Broker port
    pub port: u16,
    /// Topic (or topic filter) to subscribe to
    pub topic: String,
    /// Client identifier presented to the broker
    pub client_id: String,
}

impl ConnectionParams {
    /// Create connection parameters from their parts
    ///
    /// # Example
    /// ```rust
    /// use mqtt_subscribe_once::ConnectionParams;
    ///
    /// let params = ConnectionParams::new("test.mosquitto.org", 1883, "sensors/kitchen", "reader");
    /// assert_eq!(params.broker_address(), "test.mosquitto.org:1883");
    /// ```
    pub fn new(
        broker: impl Into<String>,
        port: u16,
        topic: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            broker: broker.into(),
            port,
            topic: topic.into(),
            client_id: client_id.into(),
        }
    }

    /// Parse broker address and client id from an MQTT URL
    ///
    /// The URL must carry a `client_id` query parameter, e.g.
    /// `mqtt://broker.hivemq.com:1883?client_id=reader`.
    ///
    /// # Example
    /// ```rust
    /// use mqtt_subscribe_once::ConnectionParams;
    ///
    /// let params = ConnectionParams::from_url("mqtt://localhost:1883?client_id=reader", "sensor_st")?;
    /// assert_eq!(params.client_id, "reader");
    /// # Ok::<(), rumqttc::OptionError>(())
    /// ```
    pub fn from_url(
        url: &str,
        topic: impl Into<String>,
    ) -> Result<Self, OptionError> {
        let options = MqttOptions::parse_url(url)?;
        let (broker, port) = options.broker_address();
        Ok(Self {
            broker,
            port,
            topic: topic.into(),
            client_id: options.client_id(),
        })
    }

    /// Connection parameters for a broker on localhost:1883
    pub fn localhost(topic: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self::new("localhost", DEFAULT_PORT, topic, client_id)
    }

    /// `host:port` form used in log fields and error messages
    pub fn broker_address(&self) -> String {
        format!("{}:{}", self.broker, self.port)
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::new(DEFAULT_BROKER, DEFAULT_PORT, DEFAULT_TOPIC, DEFAULT_CLIENT_ID)
    }
}

/// Timeouts and client-level behavior of the bridge
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Bound on the wait for the first message, measured from the moment
    /// the subscription request has been issued
    pub wait_timeout: Duration,
    /// Bound on connecting and receiving the broker's CONNACK
    pub connect_timeout: Duration,
    /// How long teardown waits for the background worker to stop before
    /// aborting it
    pub teardown_timeout: Duration,
    /// MQTT keep-alive interval
    pub keep_alive: Duration,
    /// Capacity of the client's request channel
    pub event_loop_capacity: usize,
    /// Quality of service requested for the subscription
    pub qos: QoS,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            connect_timeout: DEFAULT_WAIT_TIMEOUT,
            teardown_timeout: Duration::from_millis(500),
            keep_alive: Duration::from_secs(60),
            event_loop_capacity: 10,
            qos: QoS::AtMostOnce,
        }
    }
}

impl BridgeSettings {
    /// Set the wait bound for the first message
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Set the bound on connection establishment
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long closing the session may wait for the event loop to stop
    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    /// Set the subscription QoS
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }
}
