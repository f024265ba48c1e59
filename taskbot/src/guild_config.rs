//! Per-server bot settings.
//!
//! Settings are keyed by the decimal guild id. A server without an entry behaves
//! exactly like one whose settings are all unset.

use crate::storage::{self, PersistenceError};
use log::{error, info, warn};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_channel_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_channel_id: Option<u64>,
}

/// Settings of every server, keyed by guild id.
pub type GuildConfigs = BTreeMap<String, GuildConfig>;

/// Contents of the config file.
///
/// Entries are read one by one. An entry that is not valid settings is kept in
/// `unreadable` and written back unchanged, unless the server's settings are
/// changed in the meantime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, Value>")]
pub struct GuildConfigDocument {
    pub configs: GuildConfigs,
    pub unreadable: BTreeMap<String, Value>,
}

impl From<BTreeMap<String, Value>> for GuildConfigDocument {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let mut document = GuildConfigDocument::default();
        for (guild_id, entry) in raw {
            match GuildConfig::deserialize(&entry) {
                Ok(config) => {
                    document.configs.insert(guild_id, config);
                }
                Err(e) => {
                    warn!("Skipping unreadable settings of server {}: {}", guild_id, e);
                    document.unreadable.insert(guild_id, entry);
                }
            }
        }
        document
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum StoredEntry<'a> {
    Config(&'a GuildConfig),
    Unreadable(&'a Value),
}

impl Serialize for GuildConfigDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: BTreeMap<&str, StoredEntry> = self
            .unreadable
            .iter()
            .map(|(guild_id, entry)| (guild_id.as_str(), StoredEntry::Unreadable(entry)))
            .collect();
        for (guild_id, config) in &self.configs {
            entries.insert(guild_id.as_str(), StoredEntry::Config(config));
        }
        entries.serialize(serializer)
    }
}

/// The channel settings a server can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSetting {
    Welcome,
    Logging,
}

impl ChannelSetting {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelSetting::Welcome => "welcome channel",
            ChannelSetting::Logging => "logging channel",
        }
    }

    fn apply(&self, config: &mut GuildConfig, channel_id: u64) {
        match self {
            ChannelSetting::Welcome => config.welcome_channel_id = Some(channel_id),
            ChannelSetting::Logging => config.logging_channel_id = Some(channel_id),
        }
    }
}

/// Server settings backed by a JSON file.
#[derive(Debug)]
pub struct ConfigRepository {
    path: PathBuf,
    document: GuildConfigDocument,
}

impl ConfigRepository {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document: GuildConfigDocument = storage::load(&path);
        info!(
            "Loaded settings for {} servers from {}",
            document.configs.len(),
            path.display()
        );
        Self { path, document }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn configs(&self) -> &GuildConfigs {
        &self.document.configs
    }

    /// Returns the settings for `guild_id`, inserting empty settings if there are none.
    ///
    /// The inserted entry is only written out by the next [`ConfigRepository::persist`].
    pub fn get(&mut self, guild_id: u64) -> GuildConfig {
        *self.entry(guild_id)
    }

    pub fn set_welcome_channel(
        &mut self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<GuildConfig, PersistenceError> {
        self.set_channel(guild_id, ChannelSetting::Welcome, channel_id)
    }

    pub fn set_logging_channel(
        &mut self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<GuildConfig, PersistenceError> {
        self.set_channel(guild_id, ChannelSetting::Logging, channel_id)
    }

    /// Sets one channel and saves. On a failed save the previous settings are restored.
    pub fn set_channel(
        &mut self,
        guild_id: u64,
        setting: ChannelSetting,
        channel_id: u64,
    ) -> Result<GuildConfig, PersistenceError> {
        let entry = self.entry(guild_id);
        let previous = *entry;
        setting.apply(entry, channel_id);
        let updated = *entry;

        if let Err(e) = self.persist() {
            *self.entry(guild_id) = previous;
            return Err(e);
        }
        info!(
            "Set {} of server {} to {}",
            setting.label(),
            guild_id,
            channel_id
        );
        Ok(updated)
    }

    /// Writes every server's settings to the backing file.
    pub fn persist(&self) -> Result<(), PersistenceError> {
        storage::save(&self.path, &self.document).inspect_err(|e| {
            error!("Failed to save server settings to {}: {}", self.path.display(), e);
        })
    }

    fn entry(&mut self, guild_id: u64) -> &mut GuildConfig {
        self.document.configs.entry(guild_id.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GUILD_ID: u64 = 123456789;

    fn setup() -> (TempDir, ConfigRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repository = ConfigRepository::load(dir.path().join("config.json"));
        (dir, repository)
    }

    #[test]
    fn get_unknown_guild_returns_empty_settings() {
        let (_dir, mut repository) = setup();

        let config = repository.get(GUILD_ID);

        assert_eq!(config, GuildConfig::default());
    }

    #[test]
    fn get_materializes_entry_without_saving() {
        // Arrange
        let (_dir, mut repository) = setup();

        // Act
        repository.get(GUILD_ID);

        // Assert
        assert!(repository.configs().contains_key("123456789"));
        assert!(!repository.path().exists());
    }

    #[test]
    fn set_welcome_channel_persists() {
        // Arrange
        let (_dir, mut repository) = setup();

        // Act
        let updated = repository.set_welcome_channel(GUILD_ID, 555).unwrap();

        // Assert
        assert_eq!(updated.welcome_channel_id, Some(555));
        assert_eq!(updated.logging_channel_id, None);
        let mut reloaded = ConfigRepository::load(repository.path());
        assert_eq!(reloaded.get(GUILD_ID), updated);
    }

    #[test]
    fn set_logging_channel_keeps_welcome_channel() {
        let (_dir, mut repository) = setup();
        repository.set_welcome_channel(GUILD_ID, 555).unwrap();

        let updated = repository.set_logging_channel(GUILD_ID, 666).unwrap();

        assert_eq!(
            updated,
            GuildConfig {
                welcome_channel_id: Some(555),
                logging_channel_id: Some(666),
            }
        );
    }

    #[test]
    fn settings_are_independent_per_guild() {
        let (_dir, mut repository) = setup();

        repository.set_welcome_channel(1, 10).unwrap();
        repository.set_welcome_channel(2, 20).unwrap();

        assert_eq!(repository.get(1).welcome_channel_id, Some(10));
        assert_eq!(repository.get(2).welcome_channel_id, Some(20));
    }

    #[test]
    fn unset_channels_are_left_out_of_the_file() {
        let (_dir, mut repository) = setup();

        repository.set_logging_channel(GUILD_ID, 666).unwrap();

        let written = std::fs::read_to_string(repository.path()).unwrap();
        assert!(written.contains("\"logging_channel_id\": 666"));
        assert!(!written.contains("welcome_channel_id"));
    }

    #[test]
    fn failed_save_restores_previous_settings() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let mut repository = ConfigRepository {
            path: blocker.join("config.json"),
            document: GuildConfigDocument {
                configs: GuildConfigs::from([(
                    GUILD_ID.to_string(),
                    GuildConfig {
                        welcome_channel_id: Some(1),
                        logging_channel_id: None,
                    },
                )]),
                ..Default::default()
            },
        };

        // Act
        let result = repository.set_welcome_channel(GUILD_ID, 2);

        // Assert
        assert!(result.is_err());
        assert_eq!(repository.get(GUILD_ID).welcome_channel_id, Some(1));
    }

    #[test]
    fn changing_a_bad_entry_replaces_it() {
        let (_dir, repository) = setup();
        std::fs::write(repository.path(), r#"{"2": {"welcome_channel_id": "oops"}}"#).unwrap();
        let mut repository = ConfigRepository::load(repository.path());

        repository.set_welcome_channel(2, 20).unwrap();

        let mut reloaded = ConfigRepository::load(repository.path());
        assert_eq!(reloaded.get(2).welcome_channel_id, Some(20));
    }
}
