//! Opportunistic decoding of message bodies.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Decoded body of the first message received.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
	/// JSON object whose values are all scalars, in document order
	Structured(Map<String, Value>),
	/// Anything else, as text
	Raw(String),
}

impl Payload {
	/// Decode a message body.
	///
	/// The bytes are read as UTF-8 (invalid sequences are replaced) and
	/// parsed as a JSON object of scalar fields. Text that is not such an
	/// object, including valid JSON of another shape, is kept verbatim.
	/// Decoding never fails.
	pub fn decode(bytes: &[u8]) -> Self {
		let text = String::from_utf8_lossy(bytes);
		match serde_json::from_str::<Value>(&text) {
			| Ok(Value::Object(fields)) if fields.values().all(is_scalar) => {
				Payload::Structured(fields)
			}
			| _ => Payload::Raw(text.into_owned()),
		}
	}

	/// Fields of a structured payload
	pub fn as_structured(&self) -> Option<&Map<String, Value>> {
		match self {
			| Payload::Structured(fields) => Some(fields),
			| Payload::Raw(_) => None,
		}
	}

	/// Text of a raw payload
	pub fn as_raw(&self) -> Option<&str> {
		match self {
			| Payload::Raw(text) => Some(text),
			| Payload::Structured(_) => None,
		}
	}

	/// Look up a single field of a structured payload
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.as_structured().and_then(|fields| fields.get(key))
	}
}

fn is_scalar(value: &Value) -> bool {
	!matches!(value, Value::Array(_) | Value::Object(_))
}

impl fmt::Display for Payload {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| Payload::Structured(fields) => {
				for (key, value) in fields {
					match value {
						| Value::String(text) => writeln!(f, "{key}: {text}")?,
						| other => writeln!(f, "{key}: {other}")?,
					}
				}
				Ok(())
			}
			| Payload::Raw(text) => f.write_str(text),
		}
	}
}
