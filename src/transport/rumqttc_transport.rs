use std::time::Duration;

use rumqttc::Packet::{self, Disconnect, Publish};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, EventLoop, MqttOptions, QoS};
use rumqttc::{Event::Incoming, Event::Outgoing, SubAck, SubscribeReasonCode};
use tokio::time;
use tracing::{debug, trace};

use super::{
	Transport, TransportControl, TransportError, TransportEvent,
	TransportEvents,
};
use crate::client::config::{BridgeSettings, ConnectionParams};
use crate::client::error::ConnectionEstablishmentError;

/// Connects through `rumqttc`'s async client.
///
/// Every call to [`Transport::connect`] builds a fresh `AsyncClient` /
/// `EventLoop` pair with a clean session; nothing is shared between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RumqttcTransport;

impl RumqttcTransport {
	fn options(
		params: &ConnectionParams,
		settings: &BridgeSettings,
	) -> Result<MqttOptions, ConnectionEstablishmentError> {
		if params.client_id.is_empty() || params.client_id.starts_with(' ') {
			return Err(ConnectionEstablishmentError::InvalidClientId {
				client_id: params.client_id.clone(),
			});
		}
		// rumqttc only accepts zero or whole-second keep-alives
		let keep_alive = if settings.keep_alive.is_zero() {
			Duration::ZERO
		} else {
			settings.keep_alive.max(Duration::from_secs(1))
		};
		let mut options = MqttOptions::new(
			params.client_id.as_str(),
			params.broker.as_str(),
			params.port,
		);
		options.set_keep_alive(keep_alive).set_clean_session(true);
		Ok(options)
	}
}

/// Polls until the broker answers CONNECT.
///
/// Packets seen before the CONNACK (the outgoing CONNECT itself) are skipped.
async fn await_connack(
	event_loop: &mut EventLoop,
	broker: &str,
) -> Result<(), ConnectionEstablishmentError> {
	loop {
		let event = event_loop.poll().await.map_err(|source| {
			ConnectionEstablishmentError::Network {
				broker: broker.to_owned(),
				source,
			}
		})?;
		let Incoming(Packet::ConnAck(ConnAck { code, .. })) = event else {
			trace!(event = ?event, "Waiting for CONNACK");
			continue;
		};
		if code != ConnectReturnCode::Success {
			return Err(ConnectionEstablishmentError::BrokerRejected {
				broker: broker.to_owned(),
				code,
			});
		}
		debug!(broker, "Broker accepted connection");
		return Ok(());
	}
}

impl Transport for RumqttcTransport {
	type Control = AsyncClient;
	type Events = EventLoop;

	async fn connect(
		&self,
		params: &ConnectionParams,
		settings: &BridgeSettings,
	) -> Result<(AsyncClient, EventLoop), ConnectionEstablishmentError> {
		let options = Self::options(params, settings)?;
		let (client, mut event_loop) =
			AsyncClient::new(options, settings.event_loop_capacity);

		let broker = params.broker_address();
		let timeout_millis =
			u64::try_from(settings.connect_timeout.as_millis())
				.unwrap_or(u64::MAX);
		time::timeout(
			settings.connect_timeout,
			await_connack(&mut event_loop, &broker),
		)
		.await
		.map_err(|_| ConnectionEstablishmentError::Timeout {
			broker: broker.clone(),
			timeout_millis,
		})??;

		Ok((client, event_loop))
	}
}

impl TransportControl for AsyncClient {
	async fn subscribe(
		&self,
		topic: &str,
		qos: QoS,
	) -> Result<(), TransportError> {
		AsyncClient::subscribe(self, topic, qos).await?;
		Ok(())
	}

	async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
		AsyncClient::unsubscribe(self, topic).await?;
		Ok(())
	}

	async fn disconnect(&self) -> Result<(), TransportError> {
		AsyncClient::disconnect(self).await?;
		Ok(())
	}
}

impl TransportEvents for EventLoop {
	async fn next_event(&mut self) -> Result<TransportEvent, TransportError> {
		let event = match self.poll().await? {
			| Incoming(Publish(p)) => TransportEvent::Message {
				topic: p.topic,
				payload: p.payload,
			},
			| Incoming(Packet::SubAck(SubAck { return_codes, .. }))
				if return_codes
					.iter()
					.any(|code| matches!(code, SubscribeReasonCode::Failure)) =>
			{
				TransportEvent::SubscriptionRejected
			}
			| Incoming(Disconnect) => {
				debug!("Received MQTT Disconnect packet from server");
				TransportEvent::Closed
			}
			| Outgoing(rumqttc::Outgoing::Disconnect) => {
				debug!("Sent MQTT Disconnect packet to server");
				TransportEvent::Closed
			}
			| notification => {
				trace!(notification = ?notification, "MQTT notification");
				TransportEvent::Other
			}
		};
		Ok(event)
	}
}
