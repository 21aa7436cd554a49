//! Autosave timer and save-decision controller.
//!
//! Owns the configuration and the elapsed-time state, decides when to save,
//! and delegates the save itself to the [`DocumentHost`]. Every entry point
//! is infallible toward the caller: failures are absorbed into notices so a
//! fault here can never interrupt the host's event loop.
//!
//! Time is injected. All entry points take `now` in seconds on an arbitrary
//! monotonic timeline, which keeps every timing decision deterministic under
//! test; only the copy-suffix timestamp reads the wall clock, since it names
//! files.

use crate::host::{DocumentHost, Notifier};
use crate::model::{AutoSaveConfig, LifecycleEvent, Notice, StatusSnapshot};
use std::path::{Path, PathBuf};
use time::macros::format_description;

pub(crate) struct AutoSaveController<H, N> {
    host: H,
    notifier: N,
    config: AutoSaveConfig,
    /// Timeline second of the last successful save (or qualifying skip).
    /// Only ever moves forward within a session.
    last_save_time: f64,
    initialized: bool,
}

impl<H: DocumentHost, N: Notifier> AutoSaveController<H, N> {
    pub fn new(host: H, notifier: N, config: AutoSaveConfig) -> Self {
        Self {
            host,
            notifier,
            config: config.clamped(),
            last_save_time: 0.0,
            initialized: false,
        }
    }

    /// Start the timer. Idempotent: calls after the first are no-ops, so a
    /// host that re-fires its init hook cannot rewind the timer.
    pub fn initialize(&mut self, now: f64) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.last_save_time = now;
        if self.config.notify {
            self.notifier.notify(Notice::info(format!(
                "Autosave initialized, saving every {:.1} minutes",
                self.config.interval_seconds / 60.0
            )));
        }
    }

    /// Periodic tick from the host. Saves once the configured interval has
    /// elapsed since the last save; otherwise returns immediately.
    pub fn on_tick(&mut self, now: f64) {
        if !self.config.enabled {
            return;
        }
        if now - self.last_save_time >= self.config.interval_seconds {
            self.perform_save(now, None);
        }
    }

    /// Host mode change. Entering run mode forces a save regardless of
    /// elapsed time; every other transition is ignored.
    pub fn on_lifecycle(&mut self, event: LifecycleEvent, now: f64) {
        if self.config.enabled && event == LifecycleEvent::EnteringRunMode {
            self.perform_save(now, Some("Auto-saving before entering run mode"));
        }
    }

    /// Manual save trigger. Bypasses the `enabled` check.
    pub fn save_now(&mut self, now: f64) {
        self.perform_save(now, Some("Manual save triggered"));
    }

    /// Seconds until the next automatic save: `-1.0` when disabled, never
    /// negative otherwise.
    pub fn time_until_next_save(&self, now: f64) -> f64 {
        if !self.config.enabled {
            return -1.0;
        }
        (self.config.interval_seconds - (now - self.last_save_time)).max(0.0)
    }

    /// Restart the countdown from `now`.
    pub fn reset_timer(&mut self, now: f64) {
        self.last_save_time = now;
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.config
    }

    /// Replace the configuration (clamping the interval) and restart the
    /// countdown while enabled, so an edit never triggers an immediate save
    /// against a stale timestamp.
    pub fn apply_config(&mut self, config: AutoSaveConfig, now: f64) {
        self.config = config.clamped();
        if self.config.enabled {
            self.reset_timer(now);
        }
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn status(&self, now: f64) -> StatusSnapshot {
        StatusSnapshot {
            config: self.config.clone(),
            seconds_until_save: self.time_until_next_save(now),
        }
    }

    /// The save procedure shared by tick, lifecycle, and manual triggers.
    fn perform_save(&mut self, now: f64, custom_message: Option<&str>) {
        // Saving mid-simulation or mid-build corrupts state in most hosts.
        // Skip silently and leave the timer alone.
        if self.host.is_running() || self.host.is_building() {
            return;
        }

        let Some(original) = self.host.active_path() else {
            if self.config.notify {
                self.notifier.notify(Notice::warning(
                    "Document has not been saved yet, save it manually first",
                ));
            }
            // Advance anyway: without a backing path every subsequent tick
            // would qualify and retry, flooding the notice channel.
            self.last_save_time = now;
            return;
        };

        let target = if self.config.save_copy {
            copy_target_path(&original, &copy_stamp())
        } else {
            original.clone()
        };

        match self.host.save(&target, self.config.save_copy) {
            Ok(true) => {
                self.last_save_time = now;
                if self.config.notify {
                    let message = match custom_message {
                        Some(msg) => msg.to_string(),
                        None => format!("Scene saved: {}", display_name(&target)),
                    };
                    self.notifier.notify(Notice::info(message));
                }
            }
            // Failure leaves last_save_time untouched so the next qualifying
            // tick retries. Deliberately asymmetric with the missing-path
            // skip above.
            Ok(false) => {
                self.notifier
                    .notify(Notice::error(format!("Failed to save {}", display_name(&target))));
            }
            Err(e) => {
                self.notifier
                    .notify(Notice::error(format!("Save failed: {e:#}")));
            }
        }
    }
}

/// Sibling path for a timestamped copy: `Scenes/Level1.scene` with stamp
/// `20240101_120000` becomes `Scenes/Level1_AutoSave_20240101_120000.scene`.
pub(crate) fn copy_target_path(original: &Path, stamp: &str) -> PathBuf {
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scene");
    let name = match original.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_AutoSave_{stamp}.{ext}"),
        None => format!("{stem}_AutoSave_{stamp}"),
    };
    original.with_file_name(name)
}

/// Wall-clock stamp for copy file names, local offset preferred.
fn copy_stamp() -> String {
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(&fmt).unwrap_or_else(|_| "00000000_000000".into())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
