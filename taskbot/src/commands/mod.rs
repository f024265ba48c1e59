//! Command handlers.
//!
//! Each handler locks the repository it needs, applies the operation, releases
//! the lock and then renders the outcome through a [`DiscordConnector`].
//! Domain failures (unknown task, invalid date, failed save) become user-facing
//! replies; only failures to talk to Discord are returned as errors.
//!
//! [`DiscordConnector`]: crate::connectors::discord::DiscordConnector

use crate::connectors::discord;
use thiserror::Error;

pub mod admin;
pub mod task;

pub(crate) const NOT_IN_SERVER: &str = "This command can only be used in a server.";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Something went wrong with Discord")]
    DiscordError(#[from] discord::Error),
}

/// Upper-cases the first character.
pub(crate) fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
