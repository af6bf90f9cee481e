use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::config::{BridgeSettings, ConnectionParams};
use super::error::BridgeError;
use crate::connection::Session;
use crate::outcome::{Outcome, Phase};
use crate::payload::Payload;
use crate::topic::TopicFilter;
use crate::transport::{
	RumqttcTransport, Transport, TransportError, TransportEvent,
	TransportEvents,
};

/// Single-slot handoff from the background worker to the waiting caller
type Handoff = oneshot::Sender<Result<Payload, TransportError>>;

/// Bounded single-shot subscribe-and-wait bridge.
///
/// Each call to [`run`](Self::run) opens a fresh connection, subscribes,
/// waits for the first matching message until the deadline, releases the
/// connection and returns exactly one [`Outcome`]. Calls share nothing.
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use mqtt_subscribe_once::{BridgeSettings, ConnectionParams, Outcome, SubscribeOnce};
///
/// # async fn demo() {
/// let bridge = SubscribeOnce::with_settings(
/// 	BridgeSettings::default().with_wait_timeout(Duration::from_secs(3)),
/// );
/// let params = ConnectionParams::new("test.mosquitto.org", 1883, "sensors/+/temp", "reader");
/// match bridge.run(&params).await {
/// 	Outcome::Success(payload) => println!("{payload}"),
/// 	Outcome::Timeout => println!("nothing published"),
/// 	Outcome::ConnectionError(message) => eprintln!("{message}"),
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SubscribeOnce<T = RumqttcTransport> {
	transport: T,
	settings: BridgeSettings,
}

impl SubscribeOnce<RumqttcTransport> {
	/// Bridge over `rumqttc` with default settings
	pub fn new() -> Self {
		Self::with_settings(BridgeSettings::default())
	}

	/// Bridge over `rumqttc` with custom settings
	pub fn with_settings(settings: BridgeSettings) -> Self {
		Self::with_transport(RumqttcTransport, settings)
	}
}

impl Default for SubscribeOnce<RumqttcTransport> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Transport> SubscribeOnce<T> {
	/// Bridge over any transport
	pub fn with_transport(transport: T, settings: BridgeSettings) -> Self {
		Self {
			transport,
			settings,
		}
	}

	/// Settings used by every invocation
	pub fn settings(&self) -> &BridgeSettings {
		&self.settings
	}

	/// Connect, subscribe, wait for the first message, disconnect.
	///
	/// Never fails: errors are reported as [`Outcome::ConnectionError`].
	pub async fn run(&self, params: &ConnectionParams) -> Outcome {
		let span = info_span!(
			"subscribe_once",
			broker = %params.broker_address(),
			topic = %params.topic,
			client_id = %params.client_id,
		);
		async {
			debug!(phase = %Phase::Idle, "Starting invocation");
			let outcome = match self.try_run(params).await {
				| Ok(outcome) => outcome,
				| Err(err) => {
					warn!(error = %err, "Subscribe-once invocation failed");
					Outcome::from(err)
				}
			};
			info!(phase = %outcome.phase(), "Invocation finished");
			outcome
		}
		.instrument(span)
		.await
	}

	/// Blocking form of [`run`](Self::run).
	///
	/// Builds a current-thread runtime for the duration of the call. When the
	/// calling thread already runs inside a runtime, the call is moved to a
	/// scoped thread of its own, blocking the caller until it finishes.
	pub fn run_blocking(&self, params: &ConnectionParams) -> Outcome {
		if tokio::runtime::Handle::try_current().is_err() {
			return self.block_on_own_runtime(params);
		}
		debug!("Inside an async runtime, blocking call runs on its own thread");
		std::thread::scope(|scope| {
			scope
				.spawn(|| self.block_on_own_runtime(params))
				.join()
				.unwrap_or_else(|_| {
					error!("Blocking call thread panicked");
					Outcome::from(BridgeError::BlockingThreadPanicked)
				})
		})
	}

	fn block_on_own_runtime(&self, params: &ConnectionParams) -> Outcome {
		match tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
		{
			| Ok(runtime) => runtime.block_on(self.run(params)),
			| Err(err) => {
				error!(error = %err, "Failed to build runtime");
				Outcome::from(BridgeError::Runtime(err))
			}
		}
	}

	async fn try_run(
		&self,
		params: &ConnectionParams,
	) -> Result<Outcome, BridgeError> {
		debug!(phase = %Phase::Connecting, "Connecting to broker");
		let (control, events) =
			self.transport.connect(params, &self.settings).await?;

		// The handler is armed before the subscription goes out, so the
		// first message cannot slip past it.
		let (handoff_tx, handoff_rx) = oneshot::channel();
		let filter = TopicFilter::new(params.topic.as_str());
		let worker = tokio::spawn(
			run_worker(events, filter, Some(handoff_tx)).in_current_span(),
		);
		let mut session =
			Session::new(control, worker, self.settings.teardown_timeout);

		let result = self
			.subscribe_and_wait(&mut session, &params.topic, handoff_rx)
			.await;

		session.close().await;
		debug!(phase = %Phase::Closed, "Session released");
		result
	}

	async fn subscribe_and_wait(
		&self,
		session: &mut Session<T::Control>,
		topic: &str,
		handoff_rx: oneshot::Receiver<Result<Payload, TransportError>>,
	) -> Result<Outcome, BridgeError> {
		session.subscribe(topic, self.settings.qos).await?;
		debug!(
			phase = %Phase::Waiting,
			timeout = ?self.settings.wait_timeout,
			"Subscribed, waiting for first message"
		);

		match time::timeout(self.settings.wait_timeout, handoff_rx).await {
			| Ok(Ok(Ok(payload))) => Ok(Outcome::Success(payload)),
			| Ok(Ok(Err(err))) => Err(err.into()),
			| Ok(Err(_)) => Err(BridgeError::WorkerLost),
			| Err(_) => {
				debug!(phase = %Phase::TimedOut, "No message before deadline");
				Ok(Outcome::Timeout)
			}
		}
	}
}

/// Polls the connection until it closes.
///
/// The first message matching `filter` (or the first failure) is handed over
/// through `handoff`; everything after that is only drained so pending
/// requests such as UNSUBSCRIBE and DISCONNECT reach the broker.
async fn run_worker<E: TransportEvents>(
	mut events: E,
	filter: TopicFilter,
	mut handoff: Option<Handoff>,
) {
	loop {
		match events.next_event().await {
			| Ok(TransportEvent::Message { topic, payload }) => {
				if !filter.matches(&topic) {
					debug!(topic = %topic, filter = %filter, "Ignoring message outside subscription");
					continue;
				}
				let Some(tx) = handoff.take() else {
					debug!(topic = %topic, payload_size = payload.len(), "Ignoring message after first arrival");
					continue;
				};
				debug!(topic = %topic, payload_size = payload.len(), "Received first message");
				if tx.send(Ok(Payload::decode(&payload))).is_err() {
					debug!("Waiter already gone, message dropped");
				}
			}
			| Ok(TransportEvent::SubscriptionRejected) => {
				warn!(filter = %filter, "Subscription rejected by broker");
				if let Some(tx) = handoff.take() {
					let _ = tx.send(Err(TransportError::SubscriptionRejected {
						topic: filter.as_str().to_owned(),
					}));
				}
			}
			| Ok(TransportEvent::Closed) => {
				debug!("Connection closed, worker exiting");
				break;
			}
			| Ok(TransportEvent::Other) => {}
			| Err(err) => {
				error!(error = %err, "Connection failed while waiting");
				if let Some(tx) = handoff.take() {
					let _ = tx.send(Err(err));
				}
				break;
			}
		}
	}
}

/// Subscribe once over `rumqttc` and wait up to `timeout` for the first
/// message.
pub async fn subscribe_once(
	params: &ConnectionParams,
	timeout: Duration,
) -> Outcome {
	SubscribeOnce::with_settings(
		BridgeSettings::default().with_wait_timeout(timeout),
	)
	.run(params)
	.await
}

/// Blocking form of [`subscribe_once`].
pub fn subscribe_once_blocking(
	params: &ConnectionParams,
	timeout: Duration,
) -> Outcome {
	SubscribeOnce::with_settings(
		BridgeSettings::default().with_wait_timeout(timeout),
	)
	.run_blocking(params)
}
