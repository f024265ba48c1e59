use crate::commands::{Error, NOT_IN_SERVER, capitalize};
use crate::connectors::discord::{Colour, DiscordConnector, Embed, Reply};
use crate::guild_config::{ChannelSetting, ConfigRepository};
use tokio::sync::Mutex;

const NOT_SET: &str = "Not set";

/// Handlers for `/ping` and the `/config` group.
pub struct AdminCommands<'a, DISCORD: DiscordConnector> {
    guild_configs: &'a Mutex<ConfigRepository>,
    discord_connector: &'a DISCORD,
}

impl<'a, DISCORD: DiscordConnector> AdminCommands<'a, DISCORD> {
    pub fn new(guild_configs: &'a Mutex<ConfigRepository>, discord_connector: &'a DISCORD) -> Self {
        Self {
            guild_configs,
            discord_connector,
        }
    }

    pub async fn ping(&self) -> Result<(), Error> {
        self.send(Reply::text("Pong!").ephemeral()).await
    }

    /// `/config show`
    pub async fn show_config(&self) -> Result<(), Error> {
        let Some(guild) = self.discord_connector.current_guild() else {
            return self.send(Reply::text(NOT_IN_SERVER).ephemeral()).await;
        };
        let config = self.guild_configs.lock().await.get(guild.id);

        let embed = Embed::new(format!("⚙️ Server settings for {}", guild.name), Colour::Blue)
            .field("Welcome channel", self.describe_channel(config.welcome_channel_id), false)
            .field("Logging channel", self.describe_channel(config.logging_channel_id), false)
            .footer("Use /config set_<setting> to change a setting.");
        self.send(Reply::embed(embed).ephemeral()).await
    }

    /// `/config set_welcome_channel`
    pub async fn set_welcome_channel(&self, channel_id: u64) -> Result<(), Error> {
        self.set_channel(ChannelSetting::Welcome, channel_id).await
    }

    /// `/config set_logging_channel`
    pub async fn set_logging_channel(&self, channel_id: u64) -> Result<(), Error> {
        self.set_channel(ChannelSetting::Logging, channel_id).await
    }

    async fn set_channel(&self, setting: ChannelSetting, channel_id: u64) -> Result<(), Error> {
        let Some(guild) = self.discord_connector.current_guild() else {
            return self.send(Reply::text(NOT_IN_SERVER).ephemeral()).await;
        };
        let saved = self
            .guild_configs
            .lock()
            .await
            .set_channel(guild.id, setting, channel_id);

        let embed = match saved {
            Ok(_) => {
                let mention = self
                    .discord_connector
                    .channel_mention(channel_id)
                    .unwrap_or_else(|| format!("<#{}>", channel_id));
                Embed::new(format!("✅ {} set", capitalize(setting.label())), Colour::Green)
                    .description(format!("The {} is now {}.", setting.label(), mention))
            }
            Err(e) => Embed::new("❌ Settings error", Colour::Red).description(format!(
                "Something went wrong while setting the {}: {}",
                setting.label(),
                e
            )),
        };
        self.send(Reply::embed(embed).ephemeral()).await
    }

    fn describe_channel(&self, channel_id: Option<u64>) -> String {
        match channel_id {
            Some(channel_id) => self
                .discord_connector
                .channel_mention(channel_id)
                .unwrap_or_else(|| format!("Unknown channel (ID: {})", channel_id)),
            None => NOT_SET.to_string(),
        }
    }

    async fn send(&self, reply: Reply) -> Result<(), Error> {
        self.discord_connector.send_reply(reply).await?;
        Ok(())
    }
}
