use crate::controller::AutoSaveController;
use crate::host::{ChannelNotifier, Notifier};
use crate::hostfs::FileDocumentHost;
use crate::model::{AutoSaveConfig, ControllerEvent, Notice, NoticeLevel};
use crate::orchestrator::{self, UiCommand};
use crate::prefs::{self, JsonPrefStore};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "scene-autosave",
    version,
    about = "Periodic autosave for scene documents with an optional TUI settings panel"
)]
pub struct Cli {
    /// Scene document to watch and save
    #[arg(value_name = "DOCUMENT")]
    pub document: Option<std::path::PathBuf>,

    /// Save the document once and exit
    #[arg(long)]
    pub save_now: bool,

    /// Run without the TUI, printing notices to stderr
    #[arg(long)]
    pub headless: bool,

    /// Print notices as JSON lines instead of text (headless mode)
    #[arg(long)]
    pub json: bool,

    /// Override the autosave interval, e.g. 10m or 90s (clamped to >= 1m)
    #[arg(long)]
    pub interval: Option<humantime::Duration>,

    /// Enable or disable autosave: --enabled true / --enabled false
    #[arg(long, action = clap::ArgAction::Set)]
    pub enabled: Option<bool>,

    /// Save timestamped copies instead of overwriting the document
    #[arg(long, action = clap::ArgAction::Set)]
    pub save_copy: Option<bool>,

    /// Show informational notices
    #[arg(long, action = clap::ArgAction::Set)]
    pub notify: Option<bool>,

    /// Use an alternate preference file
    #[arg(long, value_name = "FILE")]
    pub prefs: Option<std::path::PathBuf>,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && !args.headless && !args.save_now {
        return Err(anyhow::anyhow!(
            "--json only applies to --headless or --save-now runs"
        ));
    }

    let mut store = JsonPrefStore::open(args.prefs.clone()).context("open preference store")?;
    let mut config = prefs::load_config(&store);
    let overridden = apply_overrides(&mut config, &args);
    if overridden {
        prefs::persist_config(&mut store, &config).context("persist settings overrides")?;
    }

    if args.save_now {
        return run_save_now(&args, config);
    }

    if !args.headless {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, config, store).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, config, store).await;
        }
    }

    run_headless(args, config, store).await
}

/// Fold CLI overrides into the stored configuration. Returns whether any
/// field changed so the caller knows to persist.
fn apply_overrides(config: &mut AutoSaveConfig, args: &Cli) -> bool {
    let before = config.clone();
    if let Some(enabled) = args.enabled {
        config.enabled = enabled;
    }
    if let Some(interval) = args.interval {
        config.set_interval_seconds(std::time::Duration::from(interval).as_secs_f64());
    }
    if let Some(save_copy) = args.save_copy {
        config.save_copy = save_copy;
    }
    if let Some(notify) = args.notify {
        config.notify = notify;
    }
    *config != before
}

/// Stderr notifier for one-shot and headless runs.
struct StderrNotifier {
    json: bool,
}

impl Notifier for StderrNotifier {
    fn notify(&mut self, notice: Notice) {
        print_notice(&notice, self.json);
    }
}

fn print_notice(notice: &Notice, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(notice) {
            eprintln!("{line}");
        }
        return;
    }
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warn",
        NoticeLevel::Error => "error",
    };
    eprintln!("[{tag}] {}", notice.message);
}

/// One-shot manual save, then exit.
fn run_save_now(args: &Cli, config: AutoSaveConfig) -> Result<()> {
    let host = FileDocumentHost::new(args.document.clone());
    let notifier = StderrNotifier { json: args.json };
    let mut ctl = AutoSaveController::new(host, notifier, config);
    // Skip initialize(): the init notice is noise for a one-shot run and the
    // timer state dies with the process anyway.
    ctl.save_now(0.0);
    Ok(())
}

/// Headless loop for cron-style or TUI-less use: run the controller, print
/// notices, quit on ctrl-c.
async fn run_headless(args: Cli, config: AutoSaveConfig, store: JsonPrefStore) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let host = FileDocumentHost::new(args.document.clone());
    let notifier = ChannelNotifier::new(event_tx.clone());
    let ctl = AutoSaveController::new(host, notifier, config);

    let loop_handle =
        tokio::spawn(
            async move { orchestrator::run_controller(ctl, store, event_tx, cmd_rx).await },
        );

    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            if let ControllerEvent::Notice(notice) = ev {
                print_notice(&notice, args.json);
            }
            // Status snapshots are only interesting to the panel.
        }
    });

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    let _ = cmd_tx.send(UiCommand::Quit);

    loop_handle.await.context("controller task failed")??;
    let _ = printer.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Cli {
        Cli::parse_from(["scene-autosave"])
    }

    #[test]
    fn no_flags_means_no_override() {
        let mut cfg = AutoSaveConfig::default();
        assert!(!apply_overrides(&mut cfg, &base_args()));
        assert_eq!(cfg, AutoSaveConfig::default());
    }

    #[test]
    fn interval_override_parses_humantime_and_clamps() {
        let args = Cli::parse_from(["scene-autosave", "--interval", "10s"]);
        let mut cfg = AutoSaveConfig::default();
        assert!(apply_overrides(&mut cfg, &args));
        assert_eq!(cfg.interval_seconds, 60.0);

        let args = Cli::parse_from(["scene-autosave", "--interval", "5m"]);
        let mut cfg = AutoSaveConfig::default();
        assert!(apply_overrides(&mut cfg, &args));
        assert_eq!(cfg.interval_seconds, 300.0);
    }

    #[test]
    fn bool_overrides_take_explicit_values() {
        let args = Cli::parse_from([
            "scene-autosave",
            "--enabled",
            "false",
            "--save-copy",
            "true",
            "--notify",
            "false",
        ]);
        let mut cfg = AutoSaveConfig::default();
        assert!(apply_overrides(&mut cfg, &args));
        assert!(!cfg.enabled);
        assert!(cfg.save_copy);
        assert!(!cfg.notify);
    }

    #[test]
    fn override_matching_stored_value_is_not_a_change() {
        let args = Cli::parse_from(["scene-autosave", "--enabled", "true"]);
        let mut cfg = AutoSaveConfig::default();
        assert!(!apply_overrides(&mut cfg, &args));
    }
}
