//! BlueZ-backed Bluetooth adapter capability.
//!
//! The adapter's `Powered` property is read once when opened and then kept
//! current from the adapter's event stream, so [`BluetoothAdapter::is_enabled`]
//! never has to wait on D-Bus.

use std::sync::{
   Arc,
   atomic::{AtomicBool, Ordering},
};

use bluer::{Adapter, AdapterEvent, AdapterProperty, Session};
use futures::stream::StreamExt;
use log::{debug, info, warn};
use smol_str::SmolStr;
use tokio::task::JoinHandle;

use crate::{
   error::{Result, ScoError},
   platform::BluetoothAdapter,
};

/// A BlueZ adapter whose power state is tracked in the background.
pub struct BluezAdapter {
   name: SmolStr,
   powered: Arc<AtomicBool>,
   monitor: JoinHandle<()>,
}

impl BluezAdapter {
   /// Opens the adapter called `name`, or the system default adapter.
   pub async fn open(session: &Session, name: Option<&str>) -> Result<Self> {
      let adapter = match name {
         Some(name) => session.adapter(name)?,
         None => {
            if session.adapter_names().await?.is_empty() {
               return Err(ScoError::AdapterNotAvailable);
            }
            session.default_adapter().await?
         },
      };

      let name = SmolStr::new(adapter.name());
      let powered = Arc::new(AtomicBool::new(adapter.is_powered().await?));
      info!(
         "Using adapter {name} (powered: {})",
         powered.load(Ordering::Relaxed)
      );

      let monitor = Self::start_monitor(name.clone(), adapter, powered.clone());
      Ok(Self {
         name,
         powered,
         monitor,
      })
   }

   pub fn name(&self) -> &str {
      &self.name
   }

   fn start_monitor(name: SmolStr, adapter: Adapter, powered: Arc<AtomicBool>) -> JoinHandle<()> {
      tokio::spawn(async move {
         let Ok(mut events) = adapter.events().await else {
            warn!("Failed to get events for adapter {name}; power state will not update");
            return;
         };

         while let Some(event) = events.next().await {
            if let AdapterEvent::PropertyChanged(AdapterProperty::Powered(on)) = event {
               debug!("Adapter {name} powered: {on}");
               powered.store(on, Ordering::Relaxed);
            }
         }

         // Event stream ends when the adapter goes away
         warn!("Adapter {name} lost");
         powered.store(false, Ordering::Relaxed);
      })
   }
}

impl BluetoothAdapter for BluezAdapter {
   fn is_enabled(&self) -> bool {
      self.powered.load(Ordering::Relaxed)
   }
}

impl Drop for BluezAdapter {
   fn drop(&mut self) {
      self.monitor.abort();
   }
}
