//! REST endpoint for a captain's active-order overview: the riders and
//! passengers they are carrying, with last stored profile locations, plus
//! the deduplicated set of destinations.

use axum::{extract::State, http::StatusCode, Json};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::auth::jwt::{Claims, Role};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Rider or passenger summary as stored in the users table.
#[derive(Debug, Serialize)]
pub struct RiderSummary {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
    pub location: Option<GeoPoint>,
}

/// A numbered destination entry, deduplicated by coordinates.
#[derive(Debug, Serialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Debug, Serialize)]
pub struct RiderLocationsResponse {
    pub riders: Vec<RiderSummary>,
    pub destinations: Vec<Destination>,
}

/// GET /api/orders/rider-locations — captain only.
/// Walks every non-cancelled order of the authenticated captain, collecting
/// the primary rider and passenger summaries in order, and one destination
/// entry per distinct coordinate pair.
pub async fn rider_locations(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<RiderLocationsResponse>, StatusCode> {
    if claims.role != Role::Captain {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();
    let captain_id = claims.sub.clone();

    let response = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        collect_rider_locations(&conn, &captain_id).map_err(|e| {
            tracing::error!(error = %e, "rider-locations query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(response))
}

fn collect_rider_locations(
    conn: &Connection,
    captain_id: &str,
) -> Result<RiderLocationsResponse, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, destination_lat, destination_lng FROM taxi_orders
         WHERE captain_id = ?1 AND cancelled = 0
         ORDER BY created_at DESC",
    )?;
    let orders = stmt
        .query_map(params![captain_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut riders = Vec::new();
    let mut destinations: Vec<Destination> = Vec::new();

    for (index, (order_id, user_id, dest_lat, dest_lng)) in orders.iter().enumerate() {
        if let Some(summary) = user_summary(conn, user_id)? {
            riders.push(summary);
        }

        let mut passenger_stmt = conn.prepare(
            "SELECT user_id FROM order_passengers WHERE order_id = ?1 ORDER BY user_id",
        )?;
        let passenger_ids = passenger_stmt
            .query_map(params![order_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;
        for passenger_id in &passenger_ids {
            if let Some(summary) = user_summary(conn, passenger_id)? {
                riders.push(summary);
            }
        }

        let point = GeoPoint {
            lat: *dest_lat,
            lng: *dest_lng,
        };
        if !destinations.iter().any(|d| d.location == point) {
            destinations.push(Destination {
                id: format!("destination{}", index + 1),
                name: format!("Destination {}", index + 1),
                location: point,
            });
        }
    }

    Ok(RiderLocationsResponse {
        riders,
        destinations,
    })
}

fn user_summary(conn: &Connection, user_id: &str) -> Result<Option<RiderSummary>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, name, picture, location_lat, location_lng FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            let lat: Option<f64> = row.get(3)?;
            let lng: Option<f64> = row.get(4)?;
            Ok(RiderSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                picture: row.get(2)?,
                location: match (lat, lng) {
                    (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
                    _ => None,
                },
            })
        },
    )
    .optional()
}
