use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{POLL_INTERVAL_SECS, QUERY_PAGE_SIZE};
use crate::mail::types::{ComposeEmail, EmailAddress};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Canned message used by the compose actions
    #[serde(default)]
    pub compose: ComposeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Seconds between background refreshes of the thread list
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Rows requested per query page
    #[serde(default = "default_query_page_size")]
    pub query_page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            query_page_size: default_query_page_size(),
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    #[serde(default)]
    pub keybinding_mode: KeybindingMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeybindingMode {
    #[default]
    Default,
    /// Adds Ctrl-n / Ctrl-p as cursor aliases
    Vim,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposeConfig {
    #[serde(default = "default_compose_to")]
    pub to: String,
    #[serde(default = "default_compose_to_name")]
    pub to_name: String,
    #[serde(default = "default_compose_subject")]
    pub subject: String,
    #[serde(default = "default_compose_body")]
    pub body: String,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            to: default_compose_to(),
            to_name: default_compose_to_name(),
            subject: default_compose_subject(),
            body: default_compose_body(),
        }
    }
}

impl ComposeConfig {
    /// Build the message sent from `from`.
    pub fn message(&self, from: &str) -> ComposeEmail {
        let to = if self.to_name.is_empty() {
            EmailAddress::new(&self.to)
        } else {
            EmailAddress::with_name(&self.to, &self.to_name)
        };
        ComposeEmail {
            from: EmailAddress::new(from),
            to: vec![to],
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    POLL_INTERVAL_SECS
}

fn default_query_page_size() -> usize {
    QUERY_PAGE_SIZE
}

fn default_compose_to() -> String {
    "test@ltt.rs".to_string()
}

fn default_compose_to_name() -> String {
    "Test Thetest".to_string()
}

fn default_compose_subject() -> String {
    "This is a test".to_string()
}

fn default_compose_body() -> String {
    "This is a message from ltt.rs".to_string()
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("lttr");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dir = dirs::data_local_dir()
            .context("Could not find data directory")?
            .join("lttr");
        Ok(dir)
    }

    /// Load the config file; a missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
