//! Per-invocation connection management
//!
//! A [`Session`] owns everything one invocation acquires: the request half
//! of the connection, the subscription and the background worker polling the
//! event half. It is released with [`Session::close`] on every exit path.

use std::time::Duration;

use rumqttc::QoS;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, warn};

use crate::transport::{TransportControl, TransportError};

/// Connection handle scoped to one invocation
pub struct Session<C: TransportControl> {
	control: C,
	subscribed_topic: Option<String>,
	worker: Option<JoinHandle<()>>,
	teardown_timeout: Duration,
}

impl<C: TransportControl> Session<C> {
	/// Take ownership of a connected control handle and its running worker
	pub(crate) fn new(
		control: C,
		worker: JoinHandle<()>,
		teardown_timeout: Duration,
	) -> Self {
		Self {
			control,
			subscribed_topic: None,
			worker: Some(worker),
			teardown_timeout,
		}
	}

	/// Request the subscription; it is remembered so `close` can drop it
	pub(crate) async fn subscribe(
		&mut self,
		topic: &str,
		qos: QoS,
	) -> Result<(), TransportError> {
		self.control.subscribe(topic, qos).await?;
		self.subscribed_topic = Some(topic.to_owned());
		Ok(())
	}

	/// Release the session by:
	/// 1. Unsubscribing from the topic, if the subscription was requested
	/// 2. Sending DISCONNECT (the worker stops once it has gone out)
	/// 3. Waiting for the worker, aborting it after the teardown timeout
	///
	/// Failures are logged; teardown always runs to completion.
	pub async fn close(mut self) {
		if let Some(topic) = self.subscribed_topic.take() {
			if let Err(e) = self.control.unsubscribe(&topic).await {
				debug!(topic = %topic, error = %e, "Failed to unsubscribe");
			}
		}

		if let Err(e) = self.control.disconnect().await {
			debug!(error = %e, "Failed to send disconnect");
		}

		if let Some(mut handle) = self.worker.take() {
			match time::timeout(self.teardown_timeout, &mut handle).await {
				| Ok(Ok(())) => debug!("Background worker stopped"),
				| Ok(Err(e)) => warn!(error = %e, "Background worker failed"),
				| Err(_) => {
					warn!(
						timeout = ?self.teardown_timeout,
						"Background worker did not stop in time, aborting"
					);
					handle.abort();
				}
			}
		}
	}
}

impl<C: TransportControl> Drop for Session<C> {
	fn drop(&mut self) {
		if let Some(handle) = self.worker.take() {
			error!(
				"Session dropped without calling close(), aborting background \
				 worker"
			);
			handle.abort();
		}
	}
}
