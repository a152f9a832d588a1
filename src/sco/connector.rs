//! SCO connector: request/response on top of SCO state notifications.
//!
//! A start request is answered exactly once, either immediately with `false`
//! when no enabled adapter is present, or later when the platform reports the
//! SCO link as connected (`true`) or disconnected (`false`).

use std::sync::{Arc, Weak};

use log::{debug, error, warn};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{
   error::{Result, ScoError},
   event::{Registration, ScoBroadcaster},
   platform::{AdapterRef, AudioRouterRef},
   sco::state::{ScoAudioState, ScoStateChange},
};

type Listener = Box<dyn FnOnce(bool) + Send>;

struct ConnectorInner {
   audio: AudioRouterRef,
   adapter: Option<AdapterRef>,
   pending: Mutex<Option<Listener>>,
}

impl ConnectorInner {
   fn on_state_change(&self, change: ScoStateChange) {
      debug!(
         "Bluetooth SCO state change received. Previous: {}, current: {}",
         change.previous, change.current
      );

      let succeeded = match change.state() {
         Some(ScoAudioState::Connected) => true,
         Some(ScoAudioState::Disconnected) => false,
         _ => return,
      };

      // Never call out while holding the slot
      let listener = self.pending.lock().take();
      match listener {
         Some(listener) => listener(succeeded),
         None if succeeded => debug!("Bluetooth SCO connected."),
         None => debug!("Bluetooth SCO disconnected."),
      }
   }
}

/// Starts and stops Bluetooth SCO routing and reports start outcomes.
///
/// Only one start request is tracked at a time; a new one replaces any
/// request still waiting for a state change, and the replaced listener is
/// dropped without being called. Dropping the connector unregisters it from
/// the notification channel.
pub struct ScoConnector {
   inner: Arc<ConnectorInner>,
   _registration: Registration,
}

impl ScoConnector {
   pub fn new(
      audio: AudioRouterRef,
      adapter: Option<AdapterRef>,
      notifications: &Arc<ScoBroadcaster>,
   ) -> Self {
      let inner = Arc::new(ConnectorInner {
         audio,
         adapter,
         pending: Mutex::new(None),
      });

      let weak: Weak<ConnectorInner> = Arc::downgrade(&inner);
      let registration = notifications.register(move |change| {
         if let Some(inner) = weak.upgrade() {
            inner.on_state_change(change);
         }
      });

      Self {
         inner,
         _registration: registration,
      }
   }

   /// Requests SCO routing; `listener` receives whether it succeeded.
   ///
   /// The listener may run before this returns (adapter missing or
   /// disabled) or later on the thread delivering the state change.
   pub fn start_bluetooth_sco<F>(&self, listener: F)
   where
      F: FnOnce(bool) + Send + 'static,
   {
      let enabled = self
         .inner
         .adapter
         .as_ref()
         .is_some_and(|adapter| adapter.is_enabled());

      if !enabled {
         let superseded = self.inner.pending.lock().take();
         Self::log_superseded(superseded);
         error!("Bluetooth not available; skipping.");
         listener(false);
         return;
      }

      let superseded = self.inner.pending.lock().replace(Box::new(listener));
      Self::log_superseded(superseded);
      self.inner.audio.start_bluetooth_sco();
   }

   fn log_superseded(superseded: Option<Listener>) {
      if superseded.is_some() {
         warn!("Dropping pending SCO attempt in favour of a new one");
      }
   }

   /// Requests SCO routing to stop. Any pending start request stays pending.
   pub fn stop_bluetooth_sco(&self) {
      if self.inner.adapter.is_some() {
         self.inner.audio.stop_bluetooth_sco();
      }
   }

   /// Starts an attempt and waits for its outcome.
   ///
   /// Fails with [`ScoError::AttemptSuperseded`] if another start request
   /// replaces this one before the platform reports a state change.
   pub async fn attempt(&self) -> Result<bool> {
      let (tx, rx) = oneshot::channel();
      self.start_bluetooth_sco(move |succeeded| {
         let _ = tx.send(succeeded);
      });
      rx.await.map_err(|_| ScoError::AttemptSuperseded)
   }

   /// Whether a start request is waiting for a state change.
   pub fn is_pending(&self) -> bool {
      self.inner.pending.lock().is_some()
   }
}
