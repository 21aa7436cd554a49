//! Application-level orchestration.
//!
//! This module owns the controller run loop: it delivers periodic ticks,
//! applies settings-panel commands, persists configuration edits, and emits
//! events back to presentation layers. UI/CLI layers call into this module
//! to keep responsibilities separated.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
