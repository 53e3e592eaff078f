//! Renewal decision per token and the batch over the token list.

pub mod batch;
pub mod outcome;
pub mod renewer;
