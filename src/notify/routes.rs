//! Notification save-and-push endpoint.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub user_id: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub message: String,
}

/// POST /api/notifications/send — JWT auth required.
/// Pushes to every device token registered for the target user (best-effort)
/// and saves the notification row for later retrieval.
pub async fn send_notification(
    State(state): State<AppState>,
    _claims: Claims,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, StatusCode> {
    // Fetch all device tokens registered for the target user
    let db = state.db.clone();
    let target = request.user_id.clone();
    let tokens = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut stmt = conn
            .prepare("SELECT token FROM notification_tokens WHERE user_id = ?1")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let tokens = stmt
            .query_map(params![target], |row| row.get::<_, String>(0))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<_, StatusCode>(tokens)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    // Push is best-effort; failures are logged inside the client
    state
        .push
        .send_to_tokens(&tokens, &request.title, &request.body)
        .await;

    // Save the notification row
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.execute(
            "INSERT INTO notifications (id, user_id, title, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::now_v7().to_string(),
                request.user_id,
                request.title,
                request.body,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<_, StatusCode>(())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(SendNotificationResponse {
        message: "Notification sent and saved successfully.".to_string(),
    }))
}
