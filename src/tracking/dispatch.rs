//! Fan-out of a captain's location update to its interested parties.
//!
//! Recipients of one update: every connected admin, then the primary rider
//! and passengers of the captain's current active assignment, whichever of
//! them are connected. Each send is independent and best-effort — a closed
//! or backlogged channel drops the frame for that recipient only.

use crate::orders::assignment;
use crate::state::AppState;
use crate::tracking::store::LocationSample;
use crate::ws::protocol;

/// Handle one location report from a captain's connection.
///
/// Called from the captain's reader loop, so two consecutive updates from
/// the same captain are processed (and therefore delivered) in order.
pub async fn on_captain_location(state: &AppState, captain_id: &str, sample: LocationSample) {
    state.locations.set(captain_id, sample.clone());

    // Serialize the push frame once, clone cheaply per recipient
    let Some(update) = protocol::location_update(captain_id, &sample) else {
        return;
    };

    for sender in state.connections.admin_senders() {
        let _ = sender.send(update.clone());
    }

    // Resolve who is riding with this captain right now
    let db = state.db.clone();
    let lookup_id = captain_id.to_string();
    let assignment = match tokio::task::spawn_blocking(move || {
        assignment::most_recent_active_by_captain(&db, &lookup_id)
    })
    .await
    {
        Ok(Ok(Some(assignment))) => assignment,
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            tracing::warn!(captain_id = %captain_id, error = %e, "Assignment lookup failed, skipping rider push");
            return;
        }
        Err(e) => {
            tracing::warn!(captain_id = %captain_id, error = %e, "Assignment lookup task failed");
            return;
        }
    };

    for rider_id in assignment.rider_ids() {
        if let Some(sender) = state.connections.rider_sender(rider_id) {
            let _ = sender.send(update.clone());
        }
    }
}
