//! Controller run loop.
//!
//! Drives the autosave controller with a periodic tick and serializes every
//! UI command through one `select!` loop, so controller methods never race.

use crate::controller::AutoSaveController;
use crate::host::{ChannelNotifier, PrefStore};
use crate::hostfs::FileDocumentHost;
use crate::model::{AutoSaveConfig, ControllerEvent, LifecycleEvent, Notice};
use anyhow::Result;
use std::time::Instant;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, MissedTickBehavior};

/// Commands emitted by UI layers toward the controller.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Replace the configuration (settings-panel edit) and persist it.
    ApplyConfig(AutoSaveConfig),
    /// Re-apply the documented defaults and persist them.
    RestoreDefaults,
    SaveNow,
    ResetTimer,
    /// Host run/simulation mode toggled from the panel.
    SetRunMode(bool),
    Quit,
}

/// Seconds elapsed since the loop started; the controller's injected "now".
fn elapsed(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

/// Run the autosave loop until a quit command arrives or the command channel
/// closes. Configuration edits are persisted as they happen; persistence
/// failures surface as error notices, never as loop termination.
pub(crate) async fn run_controller(
    mut ctl: AutoSaveController<FileDocumentHost, ChannelNotifier>,
    mut store: impl PrefStore,
    event_tx: UnboundedSender<ControllerEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let start = Instant::now();
    ctl.initialize(0.0);
    let _ = event_tx.send(ControllerEvent::Status(ctl.status(0.0)));

    // One tick per second keeps the countdown display honest; the save
    // decision itself only compares elapsed seconds, so the rate is not
    // correctness-sensitive.
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let now = elapsed(start);
                match cmd {
                    Some(UiCommand::ApplyConfig(cfg)) => {
                        ctl.apply_config(cfg, now);
                        persist(&mut store, &ctl, &event_tx);
                    }
                    Some(UiCommand::RestoreDefaults) => {
                        ctl.apply_config(AutoSaveConfig::default(), now);
                        persist(&mut store, &ctl, &event_tx);
                        let _ = event_tx.send(ControllerEvent::Notice(Notice::info(
                            "Restored default settings",
                        )));
                    }
                    Some(UiCommand::SaveNow) => ctl.save_now(now),
                    Some(UiCommand::ResetTimer) => ctl.reset_timer(now),
                    Some(UiCommand::SetRunMode(entering)) => {
                        if entering {
                            // Save before the mode flips; once running, the
                            // controller skips saves as unsafe.
                            ctl.on_lifecycle(LifecycleEvent::EnteringRunMode, now);
                            ctl.host_mut().set_running(true);
                        } else {
                            ctl.host_mut().set_running(false);
                            ctl.on_lifecycle(LifecycleEvent::ExitingRunMode, now);
                        }
                    }
                    Some(UiCommand::Quit) | None => break,
                }
                let _ = event_tx.send(ControllerEvent::Status(ctl.status(elapsed(start))));
            }
            _ = ticker.tick() => {
                let now = elapsed(start);
                ctl.on_tick(now);
                let _ = event_tx.send(ControllerEvent::Status(ctl.status(now)));
            }
        }
    }

    Ok(())
}

fn persist(
    store: &mut impl PrefStore,
    ctl: &AutoSaveController<FileDocumentHost, ChannelNotifier>,
    event_tx: &UnboundedSender<ControllerEvent>,
) {
    if let Err(e) = crate::prefs::persist_config(store, ctl.config()) {
        let _ = event_tx.send(ControllerEvent::Notice(Notice::error(format!(
            "Failed to persist settings: {e:#}"
        ))));
    }
}
