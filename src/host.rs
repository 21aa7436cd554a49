//! Seams toward the host environment.
//!
//! The controller never talks to the editor, the filesystem, or the user
//! directly; it goes through these traits so tests can substitute mocks and
//! the binary can plug in whichever host adapter it runs against.

use crate::model::{ControllerEvent, Notice};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// The host's view of the active document.
///
/// The controller never owns or caches document content; it only reads the
/// backing path and requests saves.
pub(crate) trait DocumentHost {
    /// Backing path of the active document, `None` if it has never been saved.
    fn active_path(&self) -> Option<PathBuf>;

    /// Whether the host is in its run/simulation mode. Saving is unsafe here.
    fn is_running(&self) -> bool;

    /// Whether the host is performing a build/compile step. Saving is unsafe here.
    fn is_building(&self) -> bool;

    /// Save the active document to `path`. With `as_copy` the document stays
    /// bound to its original path and `path` receives a copy.
    ///
    /// `Ok(false)` means the host declined the save; `Err` means it blew up.
    /// The controller treats both as the same failure.
    fn save(&mut self, path: &Path, as_copy: bool) -> Result<bool>;
}

/// User-visible notice sink.
pub(crate) trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Notifier that forwards notices to presentation layers over the controller
/// event channel. Send failures are ignored: a closed channel means the UI is
/// gone and there is nobody left to tell.
pub(crate) struct ChannelNotifier {
    tx: UnboundedSender<ControllerEvent>,
}

impl ChannelNotifier {
    pub fn new(tx: UnboundedSender<ControllerEvent>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&mut self, notice: Notice) {
        let _ = self.tx.send(ControllerEvent::Notice(notice));
    }
}

/// Typed key-value preference storage for the configuration.
pub(crate) trait PrefStore {
    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn set_bool(&mut self, key: &str, value: bool);
    fn get_f64(&self, key: &str, default: f64) -> f64;
    fn set_f64(&mut self, key: &str, value: f64);

    /// Write pending values to the backing storage.
    fn flush(&mut self) -> Result<()>;
}
