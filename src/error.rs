//! Error types for the SCO routing service.
//!
//! The connector itself reports failures as a boolean outcome; this type
//! covers everything around it: configuration, D-Bus, BlueZ and the audio
//! server tooling.

use thiserror::Error;

/// Main error type for the SCO routing service.
#[derive(Error, Debug)]
pub enum ScoError {
   #[error("Bluetooth error: {0}")]
   Bluetooth(#[from] bluer::Error),

   #[error("D-Bus error: {0}")]
   DBus(#[from] zbus::Error),

   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),

   #[error("Adapter not available")]
   AdapterNotAvailable,

   #[error("No Bluetooth audio card found")]
   CardNotFound,

   #[error("Failed to switch {card} to profile {profile}: {reason}")]
   ProfileSwitchFailed {
      card: String,
      profile: String,
      reason: String,
   },

   #[error("SCO attempt superseded by a newer request")]
   AttemptSuperseded,
}

/// Convenience type alias for Results with `ScoError`.
pub type Result<T> = std::result::Result<T, ScoError>;
