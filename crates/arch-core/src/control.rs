//! The control thread.
//!
//! All orchestrator actions run on the host's main thread. Callers from other
//! threads (commands, hotkeys, the single-instance listener, fade tickers)
//! hand their action to [`dispatch`], which queues it there.

use std::sync::Mutex;

use tauri::{AppHandle, Manager};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::{
    Error,
    opacity::{FadeTicket, TickOutcome, drive_fade},
    overlay::{Orchestrator, TauriHost},
};

pub struct OverlayState(pub Mutex<Orchestrator<TauriHost>>);

/// Runs `action` on the calling thread, which must be the main thread,
/// then starts tickers for any fades it began.
pub fn run_on_control_thread<T, F>(app: &AppHandle, action: F) -> Result<T, Error>
where
    F: FnOnce(&mut Orchestrator<TauriHost>) -> Result<T, Error>,
{
    let state = app
        .try_state::<OverlayState>()
        .ok_or_else(|| Error::WindowOperation("orchestrator not initialized".to_string()))?;

    let (result, tickets, exit) = {
        let mut orchestrator = state
            .0
            .lock()
            .map_err(|e| Error::WindowOperation(format!("orchestrator lock poisoned: {}", e)))?;
        let result = action(&mut orchestrator);
        (
            result,
            orchestrator.take_fade_tickets(),
            orchestrator.take_exit_request(),
        )
    };

    for ticket in tickets {
        spawn_fade_ticker(app.clone(), ticket);
    }

    if exit {
        info!("window with exit-on-close role closed, exiting");
        app.exit(0);
    }

    result
}

/// Queues `action` on the main thread. Failures are logged, never surfaced.
pub fn dispatch<F>(app: &AppHandle, action: F)
where
    F: FnOnce(&mut Orchestrator<TauriHost>) -> Result<(), Error> + Send + 'static,
{
    let handle = app.clone();
    let queued = app.run_on_main_thread(move || {
        if let Err(e) = run_on_control_thread(&handle, action) {
            warn!(error = %e, "orchestrator action failed");
        }
    });
    if let Err(e) = queued {
        error!(error = %e, "failed to reach the control thread");
    }
}

/// Runs `action` on the main thread and waits for its result.
pub async fn request<T, F>(app: &AppHandle, action: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce(&mut Orchestrator<TauriHost>) -> Result<T, Error> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let handle = app.clone();
    app.run_on_main_thread(move || {
        let _ = tx.send(run_on_control_thread(&handle, action));
    })?;
    rx.await
        .map_err(|_| Error::WindowOperation("control thread dropped the request".to_string()))?
}

/// Drives one fade to completion, one main-thread tick per interval.
pub fn spawn_fade_ticker(app: AppHandle, ticket: FadeTicket) {
    tauri::async_runtime::spawn(async move {
        drive_fade(ticket.interval, || {
            let (tx, rx) = oneshot::channel();
            let handle = app.clone();
            let queued = app.run_on_main_thread(move || {
                let outcome = match handle.try_state::<OverlayState>() {
                    Some(state) => match state.0.lock() {
                        Ok(mut orchestrator) => orchestrator.tick_fade(&ticket),
                        Err(_) => TickOutcome::Stale,
                    },
                    None => TickOutcome::Stale,
                };
                let _ = tx.send(outcome);
            })
            .is_ok();

            async move {
                if !queued {
                    return TickOutcome::Stale;
                }
                rx.await.unwrap_or(TickOutcome::Stale)
            }
        })
        .await;
    });
}
