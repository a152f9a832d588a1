//! SCO audio state definitions and state-change payloads.
//!
//! State changes arrive from the platform as a pair of integers, the previous
//! and the current SCO audio state. Missing or malformed values are read as
//! [`ScoAudioState::Disconnected`]; well-formed but unknown values are kept
//! as-is so that receivers can ignore them.

use std::fmt;

use serde_json::{Value, json};

/// Payload key for the previous SCO audio state.
pub const KEY_PREVIOUS_STATE: &str = "previous_state";
/// Payload key for the current SCO audio state.
pub const KEY_STATE: &str = "state";

/// SCO audio link state as reported by the platform.
#[repr(i32)]
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   strum::FromRepr,
   strum::Display,
   strum::IntoStaticStr,
)]
pub enum ScoAudioState {
   #[strum(serialize = "error")]
   Error = -1,
   #[strum(serialize = "disconnected")]
   Disconnected = 0,
   #[strum(serialize = "connected")]
   Connected = 1,
   #[strum(serialize = "connecting")]
   Connecting = 2,
}

impl ScoAudioState {
   pub const fn raw(self) -> i32 {
      self as i32
   }

   pub fn to_str(self) -> &'static str {
      self.into()
   }
}

/// A single SCO state-change notification.
///
/// Values are kept raw: a platform may report states this crate does not
/// know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoStateChange {
   pub previous: i32,
   pub current: i32,
}

impl ScoStateChange {
   pub const fn new(previous: ScoAudioState, current: ScoAudioState) -> Self {
      Self {
         previous: previous.raw(),
         current: current.raw(),
      }
   }

   /// Builds a notification from optional payload values, defaulting absent
   /// ones to `Disconnected`.
   pub fn from_extras(previous: Option<i32>, current: Option<i32>) -> Self {
      let default = ScoAudioState::Disconnected.raw();
      Self {
         previous: previous.unwrap_or(default),
         current: current.unwrap_or(default),
      }
   }

   /// Reads a notification from a JSON object of the form
   /// `{"previous_state": 0, "state": 1}`.
   pub fn from_json(value: &Value) -> Self {
      fn field(value: &Value, key: &str) -> Option<i32> {
         value
            .get(key)?
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
      }

      Self::from_extras(
         field(value, KEY_PREVIOUS_STATE),
         field(value, KEY_STATE),
      )
   }

   /// Like [`Self::from_json`], but from text. Unparseable text yields a
   /// `Disconnected` to `Disconnected` change.
   pub fn from_json_str(text: &str) -> Self {
      let value = serde_json::from_str(text).unwrap_or(Value::Null);
      Self::from_json(&value)
   }

   /// The current state, if it is one this crate knows.
   pub fn state(&self) -> Option<ScoAudioState> {
      ScoAudioState::from_repr(self.current)
   }

   /// The previous state, if it is one this crate knows.
   pub fn previous_state(&self) -> Option<ScoAudioState> {
      ScoAudioState::from_repr(self.previous)
   }

   pub fn to_json(&self) -> Value {
      json!({
         KEY_PREVIOUS_STATE: self.previous,
         KEY_STATE: self.current,
         "name": self.state().map(ScoAudioState::to_str),
      })
   }
}

impl fmt::Display for ScoStateChange {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      fn name(raw: i32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
         match ScoAudioState::from_repr(raw) {
            Some(state) => write!(f, "{state}"),
            None => write!(f, "unknown({raw})"),
         }
      }
      name(self.previous, f)?;
      f.write_str(" -> ")?;
      name(self.current, f)
   }
}
