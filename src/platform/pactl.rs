//! Audio routing through the PulseAudio/PipeWire card profile.
//!
//! Voice audio is routed over SCO by switching the Bluetooth card to its
//! headset profile, and back to A2DP when routing stops. Switches run one at
//! a time on a background task, in request order; their outcome is broadcast
//! as SCO state changes.

use log::{debug, info, warn};
use tokio::{process::Command, runtime::Handle, sync::mpsc};

use crate::{
   config::Config,
   error::{Result, ScoError},
   event::EventSender,
   platform::AudioRouter,
   sco::state::{ScoAudioState, ScoStateChange},
};

/// Card name prefix used by the audio server for Bluetooth devices.
const BLUEZ_CARD_PREFIX: &str = "bluez_card.";

/// Returns the first Bluetooth card in `pactl list short cards` output.
pub fn parse_bluez_card(listing: &str) -> Option<&str> {
   listing
      .lines()
      .filter_map(|line| line.split_whitespace().nth(1))
      .find(|card| card.starts_with(BLUEZ_CARD_PREFIX))
}

#[derive(Debug)]
enum RouterCommand {
   Start,
   Stop,
}

/// [`AudioRouter`] switching card profiles with `pactl`.
///
/// The background task exits when the router is dropped.
pub struct PactlRouter {
   inbox: mpsc::UnboundedSender<RouterCommand>,
}

impl PactlRouter {
   pub fn new(config: &Config, events: EventSender, runtime: Handle) -> Self {
      let (inbox, command_rx) = mpsc::unbounded_channel();
      runtime.spawn(
         RouterActor {
            pactl: config.pactl.clone(),
            card: config.card.clone(),
            sco_profile: config.sco_profile.clone(),
            a2dp_profile: config.a2dp_profile.clone(),
            state: ScoAudioState::Disconnected,
            events,
            command_rx,
         }
         .run(),
      );
      Self { inbox }
   }

   fn send(&self, cmd: RouterCommand) {
      if let Err(e) = self.inbox.send(cmd) {
         warn!("Router task is gone, dropping {:?}", e.0);
      }
   }
}

impl AudioRouter for PactlRouter {
   fn start_bluetooth_sco(&self) {
      self.send(RouterCommand::Start);
   }

   fn stop_bluetooth_sco(&self) {
      self.send(RouterCommand::Stop);
   }
}

// === Router Actor ===

struct RouterActor {
   pactl: String,
   card: Option<String>,
   sco_profile: String,
   a2dp_profile: String,
   state: ScoAudioState,
   events: EventSender,
   command_rx: mpsc::UnboundedReceiver<RouterCommand>,
}

impl RouterActor {
   async fn run(mut self) {
      while let Some(cmd) = self.command_rx.recv().await {
         match cmd {
            RouterCommand::Start => self.connect().await,
            RouterCommand::Stop => self.disconnect().await,
         }
      }
      debug!("SCO router shutting down");
   }

   async fn connect(&mut self) {
      self.transition(ScoAudioState::Connecting);
      match self.set_profile(&self.sco_profile).await {
         Ok(card) => {
            info!("Routed {card} to {}", self.sco_profile);
            self.transition(ScoAudioState::Connected);
         },
         Err(e) => {
            warn!("Failed to start SCO routing: {e}");
            self.transition(ScoAudioState::Disconnected);
         },
      }
   }

   async fn disconnect(&mut self) {
      match self.set_profile(&self.a2dp_profile).await {
         Ok(card) => {
            info!("Routed {card} to {}", self.a2dp_profile);
            self.transition(ScoAudioState::Disconnected);
         },
         Err(e) => warn!("Failed to stop SCO routing: {e}"),
      }
   }

   fn transition(&mut self, to: ScoAudioState) {
      let previous = std::mem::replace(&mut self.state, to);
      self.events.emit(ScoStateChange::new(previous, to));
   }

   async fn card(&self) -> Result<String> {
      if let Some(card) = &self.card {
         return Ok(card.clone());
      }

      let output = Command::new(&self.pactl)
         .args(["list", "short", "cards"])
         .output()
         .await?;
      let listing = String::from_utf8_lossy(&output.stdout);
      let card = parse_bluez_card(&listing).ok_or(ScoError::CardNotFound)?;
      debug!("Discovered Bluetooth card {card}");
      Ok(card.to_string())
   }

   async fn set_profile(&self, profile: &str) -> Result<String> {
      let card = self.card().await?;
      let output = Command::new(&self.pactl)
         .args(["set-card-profile", card.as_str(), profile])
         .output()
         .await?;

      if output.status.success() {
         Ok(card)
      } else {
         Err(ScoError::ProfileSwitchFailed {
            card,
            profile: profile.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
         })
      }
   }
}

#[cfg(test)]
mod tests {
   use std::{fs, os::unix::fs::PermissionsExt, path::Path, time::Duration};

   use tempfile::TempDir;
   use tokio::time;

   use super::*;
   use crate::event::{Registration, ScoBroadcaster};

   const LISTING: &str = "\
0\talsa_card.pci-0000_00_1f.3\tmodule-alsa-card.c
47\tbluez_card.AC_80_0A_12_34_56\tmodule-bluez5-device.c
48\tbluez_card.00_11_22_33_44_55\tmodule-bluez5-device.c
";

   #[test]
   fn test_parse_bluez_card() {
      assert_eq!(
         parse_bluez_card(LISTING),
         Some("bluez_card.AC_80_0A_12_34_56")
      );
      assert_eq!(
         parse_bluez_card("0\talsa_card.pci-0000_00_1f.3\tmodule-alsa-card.c\n"),
         None
      );
      assert_eq!(parse_bluez_card(""), None);
   }

   fn router(
      pactl: &str,
      card: Option<&str>,
   ) -> (PactlRouter, mpsc::UnboundedReceiver<ScoStateChange>, Registration) {
      let bus = ScoBroadcaster::new();
      let (tx, rx) = mpsc::unbounded_channel();
      let registration = bus.register(move |change| {
         let _ = tx.send(change);
      });
      let config = Config {
         pactl: pactl.to_string(),
         card: card.map(str::to_string),
         ..Config::default()
      };
      (
         PactlRouter::new(&config, bus, Handle::current()),
         rx,
         registration,
      )
   }

   async fn next(rx: &mut mpsc::UnboundedReceiver<ScoStateChange>) -> ScoStateChange {
      time::timeout(Duration::from_secs(5), rx.recv())
         .await
         .expect("timed out waiting for state change")
         .expect("channel closed")
   }

   #[tokio::test]
   async fn test_successful_switch_connects() {
      let (router, mut rx, _reg) = router("true", Some("bluez_card.test"));

      router.start_bluetooth_sco();
      assert_eq!(
         next(&mut rx).await,
         ScoStateChange::new(ScoAudioState::Disconnected, ScoAudioState::Connecting)
      );
      assert_eq!(
         next(&mut rx).await,
         ScoStateChange::new(ScoAudioState::Connecting, ScoAudioState::Connected)
      );

      router.stop_bluetooth_sco();
      assert_eq!(
         next(&mut rx).await,
         ScoStateChange::new(ScoAudioState::Connected, ScoAudioState::Disconnected)
      );
   }

   #[tokio::test]
   async fn test_failed_switch_disconnects() {
      let (router, mut rx, _reg) = router("false", Some("bluez_card.test"));

      router.start_bluetooth_sco();
      assert_eq!(next(&mut rx).await.state(), Some(ScoAudioState::Connecting));
      assert_eq!(
         next(&mut rx).await,
         ScoStateChange::new(ScoAudioState::Connecting, ScoAudioState::Disconnected)
      );
   }

   #[tokio::test]
   async fn test_missing_card_disconnects() {
      // `true` lists no cards
      let (router, mut rx, _reg) = router("true", None);

      router.start_bluetooth_sco();
      assert_eq!(next(&mut rx).await.state(), Some(ScoAudioState::Connecting));
      assert_eq!(
         next(&mut rx).await.state(),
         Some(ScoAudioState::Disconnected)
      );
   }

   /// Writes a `pactl` stand-in that takes a while to switch to the SCO
   /// profile and switches to any other profile immediately.
   fn slow_sco_pactl(dir: &Path) -> String {
      let path = dir.join("pactl");
      fs::write(
         &path,
         "#!/bin/sh\nif [ \"$3\" = \"headset-head-unit\" ]; then sleep 0.5; fi\nexit 0\n",
      )
      .unwrap();
      fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
      path.to_str().unwrap().to_string()
   }

   #[tokio::test]
   async fn test_stop_after_slow_start_ends_disconnected() {
      let dir = TempDir::new().unwrap();
      let pactl = slow_sco_pactl(dir.path());
      let (router, mut rx, _reg) = router(&pactl, Some("bluez_card.test"));

      router.start_bluetooth_sco();
      router.stop_bluetooth_sco();

      assert_eq!(
         next(&mut rx).await,
         ScoStateChange::new(ScoAudioState::Disconnected, ScoAudioState::Connecting)
      );
      assert_eq!(
         next(&mut rx).await,
         ScoStateChange::new(ScoAudioState::Connecting, ScoAudioState::Connected)
      );
      assert_eq!(
         next(&mut rx).await,
         ScoStateChange::new(ScoAudioState::Connected, ScoAudioState::Disconnected)
      );

      // Nothing else arrives once both switches are done
      assert!(
         time::timeout(Duration::from_millis(700), rx.recv())
            .await
            .is_err()
      );
   }
}
