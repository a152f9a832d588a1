use log::info;
use zbus::{interface, object_server::SignalEmitter};

use crate::{
   event::{EventBus, EventSender},
   sco::{connector::ScoConnector, state::ScoStateChange},
};

pub struct ScoService {
   connector: ScoConnector,
   events: EventSender,
}

impl ScoService {
   pub const fn new(connector: ScoConnector, events: EventSender) -> Self {
      Self { connector, events }
   }
}

#[interface(name = "org.scolink.Sco")]
impl ScoService {
   async fn start_bluetooth_sco(&self) -> zbus::fdo::Result<bool> {
      let succeeded = self
         .connector
         .attempt()
         .await
         .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;

      info!("SCO attempt finished: {succeeded}");
      Ok(succeeded)
   }

   async fn stop_bluetooth_sco(&self) {
      self.connector.stop_bluetooth_sco();
   }

   /// Injects a state change observed outside this service.
   async fn notify_sco_state(&self, payload: String) {
      let change = ScoStateChange::from_json_str(&payload);
      info!("External SCO state change: {change}");
      self.events.emit(change);
   }

   // Signals
   #[zbus(signal)]
   pub async fn sco_state_changed(emitter: &SignalEmitter<'_>, state: &str) -> zbus::Result<()>;

   #[zbus(property)]
   async fn pending(&self) -> bool {
      self.connector.is_pending()
   }
}
