//! Command handlers.

pub(crate) mod download;
pub(crate) mod health;
