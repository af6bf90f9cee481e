//! Bridge behavior against an in-memory broker
//!
//! The broker below implements the transport traits and keeps count of the
//! sessions and subscriptions it hands out, so every test can also check
//! that nothing is left open once the bridge has returned.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use mqtt_subscribe_once::errors::{ConnectionEstablishmentError, TransportError};
use mqtt_subscribe_once::{
	BridgeSettings, ConnectionParams, Outcome, Payload, QoS, SubscribeOnce,
	Transport, TransportControl, TransportEvent, TransportEvents,
};
use serde_json::json;
use tokio::sync::mpsc;

type EventResult = Result<TransportEvent, TransportError>;

#[derive(Default)]
struct BrokerState {
	connects: usize,
	active_sessions: usize,
	subscribe_calls: usize,
	subscriptions: Vec<String>,
	refuse_connections: bool,
	reject_subscriptions: bool,
	fail_after_subscribe: bool,
	/// Messages published to each successive connection once it subscribes
	scripts: VecDeque<Vec<(String, Bytes)>>,
}

#[derive(Clone, Default)]
struct MemoryBroker {
	state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
	fn configure(self, apply: impl FnOnce(&mut BrokerState)) -> Self {
		apply(&mut self.state());
		self
	}

	/// Queue the messages the next connection receives after subscribing
	fn script(&self, messages: &[(&str, &str)]) {
		let messages = messages
			.iter()
			.map(|(topic, body)| {
				(topic.to_string(), Bytes::copy_from_slice(body.as_bytes()))
			})
			.collect();
		self.state().scripts.push_back(messages);
	}

	fn state(&self) -> MutexGuard<'_, BrokerState> {
		self.state.lock().unwrap()
	}

	fn assert_released(&self) {
		let state = self.state();
		assert_eq!(state.active_sessions, 0, "session left open");
		assert!(state.subscriptions.is_empty(), "subscription left open");
	}
}

struct MemoryControl {
	state: Arc<Mutex<BrokerState>>,
	events: mpsc::UnboundedSender<EventResult>,
	script: Mutex<Vec<(String, Bytes)>>,
	connected: AtomicBool,
}

struct MemoryEvents {
	events: mpsc::UnboundedReceiver<EventResult>,
}

fn dropped_connection() -> rumqttc::ConnectionError {
	rumqttc::ConnectionError::Io(io::Error::new(
		io::ErrorKind::ConnectionReset,
		"connection reset by peer",
	))
}

impl Transport for MemoryBroker {
	type Control = MemoryControl;
	type Events = MemoryEvents;

	async fn connect(
		&self,
		params: &ConnectionParams,
		_settings: &BridgeSettings,
	) -> Result<(MemoryControl, MemoryEvents), ConnectionEstablishmentError> {
		let script = {
			let mut state = self.state();
			if state.refuse_connections {
				return Err(ConnectionEstablishmentError::Network {
					broker: params.broker_address(),
					source: rumqttc::ConnectionError::Io(io::Error::new(
						io::ErrorKind::ConnectionRefused,
						"connection refused",
					)),
				});
			}
			state.connects += 1;
			state.active_sessions += 1;
			state.scripts.pop_front().unwrap_or_default()
		};
		let (tx, rx) = mpsc::unbounded_channel();
		let control = MemoryControl {
			state: Arc::clone(&self.state),
			events: tx,
			script: Mutex::new(script),
			connected: AtomicBool::new(true),
		};
		Ok((control, MemoryEvents { events: rx }))
	}
}

impl TransportControl for MemoryControl {
	async fn subscribe(
		&self,
		topic: &str,
		_qos: QoS,
	) -> Result<(), TransportError> {
		let (reject, fail) = {
			let mut state = self.state.lock().unwrap();
			state.subscribe_calls += 1;
			if !state.reject_subscriptions {
				state.subscriptions.push(topic.to_string());
			}
			(state.reject_subscriptions, state.fail_after_subscribe)
		};
		if reject {
			let _ = self.events.send(Ok(TransportEvent::SubscriptionRejected));
		} else if fail {
			let _ = self.events.send(Err(dropped_connection().into()));
		} else {
			let script = std::mem::take(&mut *self.script.lock().unwrap());
			for (topic, payload) in script {
				let _ = self
					.events
					.send(Ok(TransportEvent::Message { topic, payload }));
			}
		}
		Ok(())
	}

	async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
		self.state
			.lock()
			.unwrap()
			.subscriptions
			.retain(|subscribed| subscribed != topic);
		Ok(())
	}

	async fn disconnect(&self) -> Result<(), TransportError> {
		if self.connected.swap(false, Ordering::SeqCst) {
			self.state.lock().unwrap().active_sessions -= 1;
		}
		let _ = self.events.send(Ok(TransportEvent::Closed));
		Ok(())
	}
}

impl TransportEvents for MemoryEvents {
	async fn next_event(&mut self) -> Result<TransportEvent, TransportError> {
		self.events.recv().await.unwrap_or(Ok(TransportEvent::Closed))
	}
}

fn bridge(broker: &MemoryBroker, wait: Duration) -> SubscribeOnce<MemoryBroker> {
	SubscribeOnce::with_transport(
		broker.clone(),
		BridgeSettings::default().with_wait_timeout(wait),
	)
}

fn params(topic: &str) -> ConnectionParams {
	ConnectionParams::localhost(topic, "test_reader")
}

fn connection_error(outcome: Outcome) -> String {
	match outcome {
		| Outcome::ConnectionError(message) => message,
		| other => panic!("expected a connection error, got {other:?}"),
	}
}

#[tokio::test]
async fn test_first_message_wins() {
	let broker = MemoryBroker::default();
	broker.script(&[
		("sensor_st", r#"{"temp": 22.5, "humidity": 60}"#),
		("sensor_st", r#"{"temp": 30.0, "humidity": 10}"#),
		("sensor_st", "late"),
	]);

	let outcome = bridge(&broker, Duration::from_secs(5))
		.run(&params("sensor_st"))
		.await;

	let payload = outcome.payload().expect("a message should arrive");
	assert_eq!(payload.get("temp"), Some(&json!(22.5)));
	assert_eq!(payload.get("humidity"), Some(&json!(60)));
	broker.assert_released();
}

#[tokio::test]
async fn test_plain_text_payload_is_returned_raw() {
	let broker = MemoryBroker::default();
	broker.script(&[("sensor_st", "hello")]);

	let outcome = bridge(&broker, Duration::from_secs(5))
		.run(&params("sensor_st"))
		.await;

	assert_eq!(outcome, Outcome::Success(Payload::Raw("hello".into())));
	broker.assert_released();
}

#[tokio::test(start_paused = true)]
async fn test_timeout_respects_deadline() {
	let broker = MemoryBroker::default();
	let wait = Duration::from_secs(5);

	let started = tokio::time::Instant::now();
	let outcome = bridge(&broker, wait).run(&params("sensor_st")).await;
	let elapsed = started.elapsed();

	assert_eq!(outcome, Outcome::Timeout);
	assert!(elapsed >= wait, "returned early after {elapsed:?}");
	assert!(
		elapsed < wait + Duration::from_millis(100),
		"returned late after {elapsed:?}"
	);
	broker.assert_released();
}

#[tokio::test]
async fn test_refused_connection_skips_subscribe() {
	let broker = MemoryBroker::default()
		.configure(|state| state.refuse_connections = true);

	let message = connection_error(
		bridge(&broker, Duration::from_secs(5))
			.run(&params("sensor_st"))
			.await,
	);

	assert!(!message.is_empty());
	assert!(message.contains("connection refused"), "{message}");
	assert!(message.contains("localhost:1883"), "{message}");
	assert_eq!(broker.state().subscribe_calls, 0);
	broker.assert_released();
}

#[tokio::test]
async fn test_rejected_subscription_is_a_connection_error() {
	let broker = MemoryBroker::default()
		.configure(|state| state.reject_subscriptions = true);

	let message = connection_error(
		bridge(&broker, Duration::from_secs(5))
			.run(&params("sensor_st"))
			.await,
	);

	assert!(message.contains("rejected subscription"), "{message}");
	broker.assert_released();
}

#[tokio::test]
async fn test_connection_lost_while_waiting() {
	let broker = MemoryBroker::default()
		.configure(|state| state.fail_after_subscribe = true);

	let message = connection_error(
		bridge(&broker, Duration::from_secs(5))
			.run(&params("sensor_st"))
			.await,
	);

	assert!(message.contains("connection reset"), "{message}");
	broker.assert_released();
}

#[tokio::test]
async fn test_messages_outside_filter_are_ignored() {
	let broker = MemoryBroker::default();
	broker.script(&[
		("sensors/kitchen/humidity", "55"),
		("other/kitchen/temp", "99"),
		("sensors/kitchen/temp", r#"{"temp": 21.5}"#),
	]);

	let outcome = bridge(&broker, Duration::from_secs(5))
		.run(&params("sensors/+/temp"))
		.await;

	let payload = outcome.payload().expect("matching message should arrive");
	assert_eq!(payload.get("temp"), Some(&json!(21.5)));
	broker.assert_released();
}

#[tokio::test]
async fn test_repeated_calls_are_independent() {
	let broker = MemoryBroker::default();
	broker.script(&[("sensor_st", r#"{"reading": 1}"#)]);
	broker.script(&[("sensor_st", r#"{"reading": 2}"#)]);
	let bridge = bridge(&broker, Duration::from_secs(5));

	let first = bridge.run(&params("sensor_st")).await;
	broker.assert_released();
	let second = bridge.run(&params("sensor_st")).await;
	broker.assert_released();

	assert_eq!(first.payload().and_then(|p| p.get("reading")), Some(&json!(1)));
	assert_eq!(second.payload().and_then(|p| p.get("reading")), Some(&json!(2)));
	assert_eq!(broker.state().connects, 2);
	assert_eq!(broker.state().subscribe_calls, 2);
}

#[test]
fn test_blocking_entry_point() {
	let broker = MemoryBroker::default();
	broker.script(&[("sensor_st", r#"{"temp": 19.0}"#)]);

	let outcome = bridge(&broker, Duration::from_secs(5))
		.run_blocking(&params("sensor_st"));

	assert_eq!(outcome.payload().and_then(|p| p.get("temp")), Some(&json!(19.0)));
	broker.assert_released();
}

#[tokio::test]
async fn test_blocking_entry_point_inside_runtime() {
	let broker = MemoryBroker::default();
	broker.script(&[("sensor_st", r#"{"temp": 18.5}"#)]);

	let outcome = bridge(&broker, Duration::from_secs(5))
		.run_blocking(&params("sensor_st"));

	assert_eq!(outcome.payload().and_then(|p| p.get("temp")), Some(&json!(18.5)));
	broker.assert_released();
}
