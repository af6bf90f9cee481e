//! Topic handling module
//!
//! Matching of concrete topics against the subscribed topic filter, so the
//! first-message handler only accepts traffic for its own subscription.

pub mod topic_filter;


pub use topic_filter::TopicFilter;
