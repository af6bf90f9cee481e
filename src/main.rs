//! `mqtt-read`: fetch one reading from an MQTT topic and print it.
//!
//! Configuration comes from flags, then `MQTT_*` environment variables
//! (a `.env` file in the working directory is loaded first), then defaults.
//!
//! ```bash
//! mqtt-read --broker test.mosquitto.org --topic sensors/kitchen
//! RUST_LOG=debug mqtt-read --json
//! ```

use std::fmt::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use mqtt_subscribe_once::client::config::{
	DEFAULT_BROKER, DEFAULT_CLIENT_ID, DEFAULT_PORT, DEFAULT_TOPIC,
};
use mqtt_subscribe_once::{
	ConnectionParams, Outcome, Payload, subscribe_once_blocking,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "mqtt-read", version, about = "Read one message from an MQTT topic")]
struct Args {
	/// Broker host name or IP address
	#[arg(long, env = "MQTT_BROKER_HOST", default_value = DEFAULT_BROKER)]
	broker: String,

	/// Broker port
	#[arg(
		long,
		env = "MQTT_BROKER_PORT",
		default_value_t = DEFAULT_PORT,
		value_parser = clap::value_parser!(u16).range(1..)
	)]
	port: u16,

	/// Topic (or topic filter) to subscribe to
	#[arg(long, env = "MQTT_TOPIC", default_value = DEFAULT_TOPIC)]
	topic: String,

	/// Client identifier presented to the broker
	#[arg(long, env = "MQTT_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
	client_id: String,

	/// Seconds to wait for a message once subscribed
	#[arg(
		long,
		env = "MQTT_TIMEOUT_SECS",
		default_value_t = 5,
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	timeout: u64,

	/// Print the outcome as JSON instead of text
	#[arg(long)]
	json: bool,
}

/// Setup tracing from `RUST_LOG`; silent when it is not set
fn setup_tracing() {
	if std::env::var("RUST_LOG").is_err() {
		return;
	}
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| "info".into());
	tracing_subscriber::registry()
		.with(filter)
		.with(
			tracing_subscriber::fmt::layer()
				.with_target(true)
				.with_writer(std::io::stderr)
				.compact(),
		)
		.init();
}

fn render(outcome: &Outcome, params: &ConnectionParams, timeout: Duration) -> String {
	let mut out = String::new();
	match outcome {
		| Outcome::Success(payload) => {
			out.push_str("Data received\n\n");
			match payload {
				| Payload::Structured(fields) => {
					let _ = write!(out, "{payload}");
					let document = serde_json::to_string_pretty(fields)
						.unwrap_or_else(|_| String::from("{}"));
					let _ = writeln!(out, "\nFull document:\n{document}");
				}
				| Payload::Raw(text) => {
					let _ = writeln!(out, "{text}");
				}
			}
		}
		| Outcome::Timeout => {
			let _ = writeln!(
				out,
				"No message on '{}' from {} within {:?}",
				params.topic,
				params.broker_address(),
				timeout
			);
		}
		| Outcome::ConnectionError(message) => {
			let _ = writeln!(out, "Connection error: {message}");
		}
	}
	out
}

fn exit_code(outcome: &Outcome) -> ExitCode {
	match outcome {
		| Outcome::Success(_) => ExitCode::SUCCESS,
		| Outcome::Timeout => ExitCode::from(1),
		| Outcome::ConnectionError(_) => ExitCode::from(2),
	}
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
	dotenv::dotenv().ok();
	setup_tracing();

	let args = Args::parse();
	let params =
		ConnectionParams::new(args.broker, args.port, args.topic, args.client_id);
	let timeout = Duration::from_secs(args.timeout);

	let outcome = subscribe_once_blocking(&params, timeout);

	if args.json {
		println!("{}", serde_json::to_string_pretty(&outcome)?);
	} else {
		print!("{}", render(&outcome, &params, timeout));
	}
	Ok(exit_code(&outcome))
}
