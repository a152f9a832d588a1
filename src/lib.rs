//! Bluetooth SCO voice routing connector.
//!
//! [`ScoConnector`] asks an audio service to route voice audio over a
//! Bluetooth SCO link and answers each request with a single success flag,
//! taken from the SCO state changes the platform broadcasts afterwards.

pub mod config;
pub mod dbus;
pub mod error;
pub mod event;
pub mod platform;
pub mod sco;

pub use error::{Result, ScoError};
pub use event::{EventBus, EventSender, Registration, ScoBroadcaster};
pub use sco::{
   connector::ScoConnector,
   state::{ScoAudioState, ScoStateChange},
};
