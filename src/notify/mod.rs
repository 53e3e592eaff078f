//! Delivery of the per-token statuses to Slack.

pub mod slack;
