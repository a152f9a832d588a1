//! Platform capabilities consumed by the SCO connector.
//!
//! The connector only needs to ask the audio service to start or stop SCO
//! routing and to know whether a Bluetooth adapter is enabled. The outcome
//! of a routing request is never returned here; it is observed through the
//! state-change notifications in [`crate::event`].

pub mod bluez;
pub mod pactl;

use std::sync::Arc;

/// Audio service able to route voice audio over a Bluetooth SCO link.
///
/// Both calls must return without waiting for the routing change.
pub trait AudioRouter: Send + Sync {
   fn start_bluetooth_sco(&self);

   fn stop_bluetooth_sco(&self);
}

/// Bluetooth adapter capability.
pub trait BluetoothAdapter: Send + Sync {
   /// Whether the adapter is powered and usable.
   fn is_enabled(&self) -> bool;
}

pub type AudioRouterRef = Arc<dyn AudioRouter>;
pub type AdapterRef = Arc<dyn BluetoothAdapter>;
