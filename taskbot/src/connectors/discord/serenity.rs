//! Serenity-based implementation of Discord connectivity.
//!
//! This module adapts the poise command context to the [`DiscordConnector`]
//! trait and holds the data shared by all commands.

use crate::connectors::discord::{DiscordConnector, Embed, Error, Guild, Reply};
use crate::guild_config::ConfigRepository;
use crate::tasks::TaskRepository;
use async_trait::async_trait;
use log::warn;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;
use tokio::sync::Mutex;

/// Data shared by every command invocation.
///
/// Commands run concurrently, so each repository sits behind its own lock. The
/// lock is held for the in-memory change and the file write that follows it.
pub struct Data {
    pub tasks: Mutex<TaskRepository>,
    pub guild_configs: Mutex<ConfigRepository>,
}

/// Type alias for Poise command context
pub type Context<'a> = poise::Context<'a, Data, anyhow::Error>;

/// Discord connector implementation using Serenity library.
pub struct SerenityDiscordConnector<'a> {
    context: Context<'a>,
}

impl<'a> SerenityDiscordConnector<'a> {
    /// Creates a new SerenityDiscordConnector instance.
    ///
    /// # Arguments
    ///
    /// * `context` - Poise command context for Discord interactions
    pub fn new(context: Context<'a>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl DiscordConnector for SerenityDiscordConnector<'_> {
    async fn send_reply(&self, reply: Reply) -> Result<(), Error> {
        if let Err(e) = self.context.send(reply.into()).await {
            warn!("Failed to send reply: {}", e);
            return Err(Error::CannotSendReply);
        }
        Ok(())
    }

    fn current_guild(&self) -> Option<Guild> {
        let guild_id = self.context.guild_id()?;
        let name = self
            .context
            .guild()
            .map(|guild| guild.name.clone())
            .unwrap_or_else(|| guild_id.to_string());
        Some(Guild {
            id: guild_id.get(),
            name,
        })
    }

    fn invoker_id(&self) -> u64 {
        self.context.author().id.get()
    }

    async fn user_mention(&self, user_id: u64) -> Option<String> {
        if user_id == 0 {
            return None;
        }
        match serenity::UserId::new(user_id).to_user(self.context).await {
            Ok(user) => Some(user.mention().to_string()),
            Err(e) => {
                warn!("Cannot resolve user {}: {}", user_id, e);
                None
            }
        }
    }

    fn channel_mention(&self, channel_id: u64) -> Option<String> {
        if channel_id == 0 {
            return None;
        }
        let guild = self.context.guild()?;
        guild
            .channels
            .get(&serenity::ChannelId::new(channel_id))
            .map(|channel| channel.mention().to_string())
    }
}

impl From<Embed> for serenity::CreateEmbed {
    fn from(embed: Embed) -> Self {
        let mut created = serenity::CreateEmbed::new()
            .title(embed.title)
            .colour(embed.colour.rgb());
        if let Some(description) = embed.description {
            created = created.description(description);
        }
        for field in embed.fields {
            created = created.field(field.name, field.value, field.inline);
        }
        if let Some(footer) = embed.footer {
            created = created.footer(serenity::CreateEmbedFooter::new(footer));
        }
        created
    }
}

impl From<Reply> for poise::CreateReply {
    fn from(reply: Reply) -> Self {
        let mut created = poise::CreateReply::default().ephemeral(reply.ephemeral);
        if let Some(content) = reply.content {
            created = created.content(content);
        }
        if let Some(embed) = reply.embed {
            created = created.embed(embed.into());
        }
        created
    }
}
