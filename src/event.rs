//! SCO state-change notification channel.
//!
//! State changes are broadcast to every registered receiver on the thread
//! that emits them. A receiver stays registered for as long as its
//! [`Registration`] guard is alive.

use std::sync::{
   Arc, Weak,
   atomic::{AtomicU64, Ordering},
};

use log::debug;
use parking_lot::Mutex;

use crate::sco::state::ScoStateChange;

/// Trait for implementing state-change emission.
pub trait EventBus: Send + Sync {
   /// Emits a state change to all registered receivers.
   fn emit(&self, change: ScoStateChange);
}

/// Type alias for a thread-safe event sender.
pub type EventSender = Arc<dyn EventBus>;

type Receiver = Arc<dyn Fn(ScoStateChange) + Send + Sync>;

/// In-process broadcaster for SCO state changes.
#[derive(Default)]
pub struct ScoBroadcaster {
   receivers: Mutex<Vec<(u64, Receiver)>>,
   next_id: AtomicU64,
}

impl ScoBroadcaster {
   pub fn new() -> Arc<Self> {
      Arc::new(Self::default())
   }

   /// Registers `receiver` for all subsequent state changes.
   pub fn register<F>(self: &Arc<Self>, receiver: F) -> Registration
   where
      F: Fn(ScoStateChange) + Send + Sync + 'static,
   {
      let id = self.next_id.fetch_add(1, Ordering::Relaxed);
      self.receivers.lock().push((id, Arc::new(receiver)));
      debug!("Registered SCO state receiver #{id}");
      Registration {
         bus: Arc::downgrade(self),
         id,
      }
   }

   pub fn receiver_count(&self) -> usize {
      self.receivers.lock().len()
   }

   fn unregister(&self, id: u64) {
      self.receivers.lock().retain(|(rid, _)| *rid != id);
      debug!("Unregistered SCO state receiver #{id}");
   }
}

impl EventBus for ScoBroadcaster {
   fn emit(&self, change: ScoStateChange) {
      // Receivers may register or unregister while being notified
      let receivers: Vec<Receiver> = self
         .receivers
         .lock()
         .iter()
         .map(|(_, r)| r.clone())
         .collect();
      for receiver in receivers {
         receiver(change);
      }
   }
}

/// Keeps a receiver registered; unregisters it on drop.
#[derive(Debug)]
#[must_use = "the receiver is unregistered when the registration is dropped"]
pub struct Registration {
   bus: Weak<ScoBroadcaster>,
   id: u64,
}

impl Drop for Registration {
   fn drop(&mut self) {
      if let Some(bus) = self.bus.upgrade() {
         bus.unregister(self.id);
      }
   }
}
