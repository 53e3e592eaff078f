//! Vault token API: authenticated lookups and renewals done with the token itself.

pub mod client;
pub mod error;
pub mod token;
