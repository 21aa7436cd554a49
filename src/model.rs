use serde::Serialize;

/// Floor applied to every write of the autosave interval. Anything shorter
/// degrades the editor with near-continuous disk I/O.
pub(crate) const MIN_INTERVAL_SECS: f64 = 60.0;

pub(crate) const DEFAULT_INTERVAL_SECS: f64 = 600.0;
pub(crate) const DEFAULT_ENABLED: bool = true;
pub(crate) const DEFAULT_SAVE_COPY: bool = false;
pub(crate) const DEFAULT_NOTIFY: bool = true;

/// Autosave configuration, persisted through the preference store and edited
/// by the settings panel or CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AutoSaveConfig {
    pub enabled: bool,
    /// Seconds between automatic saves. Always >= [`MIN_INTERVAL_SECS`];
    /// mutate through [`AutoSaveConfig::set_interval_seconds`].
    pub interval_seconds: f64,
    /// Save timestamped sibling copies instead of overwriting the document.
    pub save_copy: bool,
    /// Emit informational/warning notices. Errors are never suppressed.
    pub notify: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            interval_seconds: DEFAULT_INTERVAL_SECS,
            save_copy: DEFAULT_SAVE_COPY,
            notify: DEFAULT_NOTIFY,
        }
    }
}

impl AutoSaveConfig {
    /// Set the interval, clamping to the minimum.
    pub fn set_interval_seconds(&mut self, seconds: f64) {
        self.interval_seconds = seconds.max(MIN_INTERVAL_SECS);
    }

    /// Return a copy with the interval clamp re-applied. Used when values
    /// arrive from outside the setter (preference file, CLI overrides).
    pub fn clamped(mut self) -> Self {
        self.set_interval_seconds(self.interval_seconds);
        self
    }
}

/// Host-emitted mode change delivered to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleEvent {
    /// The host is about to enter its run/simulation mode. Triggers a save
    /// regardless of elapsed time; unsaved work would otherwise be at the
    /// mercy of the simulation.
    EnteringRunMode,
    /// The host returned to edit mode. No save is triggered.
    ExitingRunMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible message from the controller. This is the only way failures
/// leave the controller; nothing propagates as an error to the host loop.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Point-in-time view of the controller for presentation layers.
#[derive(Debug, Clone)]
pub(crate) struct StatusSnapshot {
    pub config: AutoSaveConfig,
    /// Seconds until the next automatic save: `-1.0` when autosave is
    /// disabled, `0.0` when a save is due on the next qualifying tick.
    pub seconds_until_save: f64,
}

/// Events emitted by the controller task and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub(crate) enum ControllerEvent {
    Notice(Notice),
    Status(StatusSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AutoSaveConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.interval_seconds, 600.0);
        assert!(!cfg.save_copy);
        assert!(cfg.notify);
    }

    #[test]
    fn interval_clamps_to_minimum() {
        let mut cfg = AutoSaveConfig::default();
        cfg.set_interval_seconds(10.0);
        assert_eq!(cfg.interval_seconds, 60.0);
        cfg.set_interval_seconds(90.5);
        assert_eq!(cfg.interval_seconds, 90.5);
    }

    #[test]
    fn clamped_repairs_out_of_range_interval() {
        let cfg = AutoSaveConfig {
            interval_seconds: 1.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(cfg.interval_seconds, 60.0);
    }
}
