//! MQTT topic filter matching

use std::fmt;

/// Single-level wildcard
const SINGLE_LEVEL: &str = "+";
/// Multi-level wildcard, only valid as the last level
const MULTI_LEVEL: &str = "#";

/// Topic filter as passed to SUBSCRIBE.
///
/// Syntax is not checked here; the client library rejects malformed filters
/// when the subscription is requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter {
	filter: String,
}

impl TopicFilter {
	/// Wrap a filter string
	pub fn new(filter: impl Into<String>) -> Self {
		Self {
			filter: filter.into(),
		}
	}

	/// Filter as originally given
	pub fn as_str(&self) -> &str {
		&self.filter
	}

	/// Check whether a concrete topic name matches this filter.
	///
	/// Topics starting with `$` never match a filter whose first level is a
	/// wildcard.
	pub fn matches(&self, topic: &str) -> bool {
		if topic.starts_with('$') && self.filter.starts_with(['+', '#']) {
			return false;
		}

		let mut filter_levels = self.filter.split('/');
		let mut topic_levels = topic.split('/');
		loop {
			match (filter_levels.next(), topic_levels.next()) {
				| (Some(MULTI_LEVEL), _) => return true,
				| (Some(SINGLE_LEVEL), Some(_)) => {}
				| (Some(expected), Some(actual)) if expected == actual => {}
				| (None, None) => return true,
				| _ => return false,
			}
		}
	}
}

impl fmt::Display for TopicFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.filter)
	}
}

impl From<&str> for TopicFilter {
	fn from(filter: &str) -> Self {
		Self::new(filter)
	}
}

impl From<String> for TopicFilter {
	fn from(filter: String) -> Self {
		Self::new(filter)
	}
}
