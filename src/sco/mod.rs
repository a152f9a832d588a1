//! Bluetooth SCO voice routing.
//!
//! This module contains the SCO state model delivered by the platform and the
//! connector that turns a routing request into a single success/failure
//! outcome.

pub mod connector;
pub mod state;
