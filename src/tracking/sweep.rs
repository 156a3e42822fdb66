//! Periodic re-push of last-known captain locations to connected riders.
//!
//! Riders who connect or reconnect between two captain pushes, or whose
//! captain has momentarily stopped reporting, converge on the cached
//! location within one sweep interval. The sweep only reads shared state and
//! pushes best-effort, so stopping or restarting it cannot corrupt anything.

use std::time::Duration;

use crate::orders::assignment;
use crate::state::AppState;
use crate::ws::protocol;

/// Spawn the background sweep task.
/// Runs one tick every `interval_secs` seconds until process shutdown.
pub fn spawn_location_sweep(state: AppState, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            run_sweep_tick(&state).await;
        }
    });
}

/// One sweep pass over every currently-connected rider.
/// A lookup failure for one rider is logged and skipped; it never aborts the
/// tick for the others.
async fn run_sweep_tick(state: &AppState) {
    let riders = state.connections.connected_riders();
    if riders.is_empty() {
        return;
    }

    let mut pushed = 0usize;
    for rider_id in riders {
        let db = state.db.clone();
        let lookup_id = rider_id.clone();
        let assignment = match tokio::task::spawn_blocking(move || {
            assignment::most_recent_active_by_rider(&db, &lookup_id)
        })
        .await
        {
            Ok(Ok(Some(assignment))) => assignment,
            Ok(Ok(None)) => continue,
            Ok(Err(e)) => {
                tracing::warn!(rider_id = %rider_id, error = %e, "Sweep assignment lookup failed");
                continue;
            }
            Err(e) => {
                tracing::warn!(rider_id = %rider_id, error = %e, "Sweep lookup task failed");
                continue;
            }
        };

        let Some(sample) = state.locations.get(&assignment.captain_id) else {
            continue;
        };
        let Some(update) = protocol::location_update(&assignment.captain_id, &sample) else {
            continue;
        };
        if let Some(sender) = state.connections.rider_sender(&rider_id) {
            let _ = sender.send(update);
            pushed += 1;
        }
    }

    if pushed > 0 {
        tracing::debug!(pushed, "Location sweep tick delivered updates");
    }
}
