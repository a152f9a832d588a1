//! Bluetooth SCO routing D-Bus service
//!
//! This service exposes SCO voice routing on the session bus: start requests
//! are answered with the outcome of the routing change, and every SCO state
//! change is re-emitted as a signal.

use std::{sync::Arc, time::Duration};

use bluer::Session;
use crossbeam::queue::SegQueue;
use log::{info, warn};
use tokio::{runtime::Handle, signal, sync::Notify, time};
use zbus::{Connection, connection, object_server::InterfaceRef};

use scolink::{
   Registration, ScoBroadcaster, ScoConnector, ScoStateChange,
   config::Config,
   dbus::{ScoService, ScoServiceSignals},
   error::Result,
   platform::{AdapterRef, bluez::BluezAdapter, pactl::PactlRouter},
};

const OBJECT_PATH: &str = "/org/scolink/sco";

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   info!("Starting scolink D-Bus service...");

   // Load configuration
   let config = Config::load()?;
   info!(
      "Loaded configuration (adapter: {}, card: {})",
      config.adapter.as_deref().unwrap_or("default"),
      config.card.as_deref().unwrap_or("auto")
   );

   // State changes fan out to the connector and to D-Bus signals
   let broadcaster = ScoBroadcaster::new();
   let signals = SignalQueue::new();
   let _signal_registration = signals.subscribe(&broadcaster);

   let adapter = open_adapter(&config).await;
   let router = PactlRouter::new(&config, broadcaster.clone(), Handle::current());
   let connector = ScoConnector::new(Arc::new(router), adapter, &broadcaster);

   // Create D-Bus service
   let service = ScoService::new(connector, broadcaster.clone());

   // Build D-Bus connection
   let connection = connection::Builder::session()?
      .name("org.scolink")?
      .serve_at(OBJECT_PATH, service)?
      .build()
      .await?;

   info!("scolink D-Bus service started at org.scolink");

   signals.spawn_dispatcher(connection).await?;

   // Wait for shutdown signal
   signal::ctrl_c().await?;
   info!("Shutting down scolink service...");

   Ok(())
}

/// Opens the configured adapter. Without one, every start request fails.
async fn open_adapter(config: &Config) -> Option<AdapterRef> {
   let session = match Session::new().await {
      Ok(session) => session,
      Err(e) => {
         warn!("Failed to create Bluetooth session: {e}");
         return None;
      },
   };

   match BluezAdapter::open(&session, config.adapter.as_deref()).await {
      Ok(adapter) => {
         info!("Watching adapter {}", adapter.name());
         Some(Arc::new(adapter))
      },
      Err(e) => {
         warn!("No usable Bluetooth adapter: {e}");
         None
      },
   }
}

struct SignalQueue {
   queue: SegQueue<ScoStateChange>,
   notifier: Notify,
}

impl SignalQueue {
   fn new() -> Arc<Self> {
      Arc::new(Self {
         queue: SegQueue::new(),
         notifier: Notify::new(),
      })
   }

   /// Queues every broadcast change. The queue stays open until the returned
   /// registration is dropped.
   fn subscribe(self: &Arc<Self>, broadcaster: &Arc<ScoBroadcaster>) -> Registration {
      let this = self.clone();
      broadcaster.register(move |change| {
         this.queue.push(change);
         this.notifier.notify_waiters();
      })
   }

   async fn recv(self: &Arc<Self>) -> Option<ScoStateChange> {
      loop {
         if let Some(change) = self.queue.pop() {
            return Some(change);
         }
         let notify = self.notifier.notified();
         if let Some(change) = self.queue.pop() {
            return Some(change);
         }
         if Arc::strong_count(self) == 1 {
            return None;
         }
         let _ = time::timeout(Duration::from_secs(1), notify).await;
      }
   }

   async fn dispatch(iface: &InterfaceRef<ScoService>, change: ScoStateChange) -> Result<()> {
      iface
         .sco_state_changed(&change.to_json().to_string())
         .await?;
      Ok(())
   }

   async fn spawn_dispatcher(self: Arc<Self>, connection: Connection) -> Result<()> {
      let iface = connection
         .object_server()
         .interface::<_, ScoService>(OBJECT_PATH)
         .await?;
      tokio::spawn(async move {
         while let Some(change) = self.recv().await {
            if let Err(e) = Self::dispatch(&iface, change).await {
               warn!("Error dispatching state change: {e}");
            }
         }
      });

      Ok(())
   }
}
