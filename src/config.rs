//! Configuration management for the SCO routing service.
//!
//! This module handles loading and saving configuration from disk: which
//! Bluetooth adapter to watch, which audio card to route, and the card
//! profiles used for voice and media audio.

use std::{
   env, fs,
   path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoError};

/// Main configuration structure for the service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
   /// BlueZ adapter name, e.g. `hci0`. The system default adapter if unset.
   #[serde(default)]
   pub adapter: Option<String>,

   /// Audio server card to route. The first `bluez_card.*` if unset.
   #[serde(default)]
   pub card: Option<String>,

   #[serde(default = "default_sco_profile")]
   pub sco_profile: String,

   #[serde(default = "default_a2dp_profile")]
   pub a2dp_profile: String,

   #[serde(default = "default_pactl")]
   pub pactl: String,
}

fn default_sco_profile() -> String {
   "headset-head-unit".to_string()
}

fn default_a2dp_profile() -> String {
   "a2dp-sink".to_string()
}

fn default_pactl() -> String {
   "pactl".to_string()
}

impl Default for Config {
   fn default() -> Self {
      Self {
         adapter: None,
         card: None,
         sco_profile: default_sco_profile(),
         a2dp_profile: default_a2dp_profile(),
         pactl: default_pactl(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      Self::load_from(&Self::config_path()?)
   }

   /// Loads configuration from `path`, writing the defaults there if the
   /// file does not exist yet.
   pub fn load_from(path: &Path) -> Result<Self> {
      if path.exists() {
         let contents = fs::read_to_string(path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         let config = Self::default();
         config.save_to(path)?;
         Ok(config)
      }
   }

   fn save_to(&self, path: &Path) -> Result<()> {
      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(scolink_home) = env::var("SCOLINK_HOME") {
         PathBuf::from(scolink_home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         return Err(ScoError::ConfigDirNotFound);
      };

      Ok(config_dir.join("scolink").join("config.toml"))
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   use tempfile::TempDir;

   #[test]
   fn test_missing_file_writes_defaults() {
      let dir = TempDir::new().unwrap();
      let path = dir.path().join("scolink").join("config.toml");

      let config = Config::load_from(&path).unwrap();
      assert_eq!(config, Config::default());
      assert!(path.exists());

      // Second load reads back what was written
      let reloaded = Config::load_from(&path).unwrap();
      assert_eq!(reloaded, config);
   }

   #[test]
   fn test_partial_file_uses_defaults() {
      let dir = TempDir::new().unwrap();
      let path = dir.path().join("config.toml");
      fs::write(&path, "adapter = \"hci1\"\nsco_profile = \"headset-head-unit-msbc\"\n").unwrap();

      let config = Config::load_from(&path).unwrap();
      assert_eq!(config.adapter.as_deref(), Some("hci1"));
      assert_eq!(config.card, None);
      assert_eq!(config.sco_profile, "headset-head-unit-msbc");
      assert_eq!(config.a2dp_profile, "a2dp-sink");
      assert_eq!(config.pactl, "pactl");
   }

   #[test]
   fn test_invalid_file_is_error() {
      let dir = TempDir::new().unwrap();
      let path = dir.path().join("config.toml");
      fs::write(&path, "adapter = [").unwrap();

      assert!(matches!(
         Config::load_from(&path),
         Err(ScoError::TomlParse(_))
      ));
   }
}
