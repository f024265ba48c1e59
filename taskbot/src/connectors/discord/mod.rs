//! Discord connectivity for the command handlers.
//!
//! Handlers never touch the Discord client directly. They build a [`Reply`] and
//! hand it to a [`DiscordConnector`], and they resolve user and channel mentions
//! through it. The Serenity-backed implementation lives in the `serenity`
//! submodule; tests use the generated `MockDiscordConnector`.

use async_trait::async_trait;
use thiserror::Error;

pub mod serenity;

/// Errors that can occur during Discord connectivity operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to send a reply message
    #[error("Cannot send reply")]
    CannotSendReply,
}

/// The server a command was invoked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
    pub id: u64,
    pub name: String,
}

/// Embed colours used by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colour {
    Green,
    #[default]
    Blue,
    Red,
    LightGrey,
}

impl Colour {
    pub fn rgb(&self) -> u32 {
        match self {
            Colour::Green => 0x2ecc71,
            Colour::Blue => 0x3498db,
            Colour::Red => 0xe74c3c,
            Colour::LightGrey => 0x979c9f,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-independent description of a rich embed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub colour: Colour,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>, colour: Colour) -> Self {
        Self {
            title: title.into(),
            colour,
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Looks up a field's value by name.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }
}

/// A message to send in response to a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    /// Only visible to the invoking user
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Default::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// Trait for abstracting Discord interactions needed by the command handlers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscordConnector {
    /// Sends a reply to the interaction that invoked the command
    async fn send_reply(&self, reply: Reply) -> Result<(), Error>;
    /// The server the command was invoked in, if any
    fn current_guild(&self) -> Option<Guild>;
    /// Id of the user that invoked the command
    fn invoker_id(&self) -> u64;
    /// Mention string for a user, if the user can be found
    async fn user_mention(&self, user_id: u64) -> Option<String>;
    /// Mention string for a channel of the current server, if it exists
    fn channel_mention(&self, channel_id: u64) -> Option<String>;
}
