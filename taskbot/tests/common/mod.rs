#![allow(dead_code)]

use std::path::PathBuf;
use taskbot::tasks::NewTask;
use tempfile::TempDir;

/// A scratch data directory that is removed when dropped.
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.path().join("tasks.json")
    }

    pub fn guild_configs_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }
}

pub fn new_task(title: &str, creator_id: u64) -> NewTask {
    NewTask {
        title: title.to_string(),
        creator_id,
        ..Default::default()
    }
}
