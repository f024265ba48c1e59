//! A Discord bot for per-server settings and a lightweight task tracker.
//!
//! Both data sets are JSON documents on local disk, loaded once at startup and
//! rewritten after every change:
//! - [`guild_config::ConfigRepository`] holds each server's welcome and logging channels
//! - [`tasks::TaskRepository`] holds the ordered task list and its lifecycle rules
//!
//! The [`commands`] module turns slash commands into repository calls and replies,
//! talking to Discord through [`connectors::discord::DiscordConnector`].

pub mod commands;
pub mod config;
pub mod connectors;
pub mod guild_config;
pub mod liveness;
pub mod storage;
pub mod tasks;
