//! Actor-per-connection lifecycle: Connecting → Authenticated → Active →
//! Closed.
//!
//! The upgrade carries no credentials; a connection authenticates with the
//! token in its first meaningful message. Until then it exists transiently
//! in the Connecting state and owns no registry entry. A credential failure
//! leaves the connection where it is — no client input is fatal, neither to
//! the connection nor to the service.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::auth::jwt::{self, Role};
use crate::state::AppState;
use crate::tracking::dispatch;
use crate::ws::protocol::{self, ClientMessage};
use crate::ws::{ConnId, ConnectionSender, Registration};

/// Ping interval: server sends WebSocket ping every 30 seconds.
/// Prevents connection leaks from abrupt disconnects.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the actor-per-connection pattern for an accepted WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: processes incoming messages, authenticates, dispatches
///
/// The mpsc channel allows any part of the system to push frames to this
/// client by cloning the sender out of the registry.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let conn_id = ConnId::next();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Greeting goes out immediately on open, before authentication.
    // Purely informational, no protocol meaning.
    if let Some(greeting) = protocol::greeting() {
        let _ = tx.send(greeting);
    }

    // Spawn writer task: forwards mpsc messages to WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!(?conn_id, "Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Identity attached on successful authentication; None while Connecting
    let mut registration: Option<Registration> = None;

    // Reader loop: process incoming WebSocket messages
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    handle_text_frame(text.as_str(), conn_id, &tx, &state, &mut registration)
                        .await;
                }
                Message::Binary(_) => {
                    tracing::debug!(?conn_id, "Received binary frame (expected JSON text)");
                }
                Message::Pong(_) => {
                    // Pong received — notify the ping task
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    // Respond to client pings with pong
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(?conn_id, reason = ?frame, "Client initiated close");
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(?conn_id, error = %e, "WebSocket receive error");
                break;
            }
            None => {
                // Stream ended — client disconnected
                tracing::info!(?conn_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer and ping tasks
    writer_handle.abort();
    ping_handle.abort();

    // Runs exactly once per connection — the reader loop above is the only
    // way here, however the close was triggered. Unregistration is scoped to
    // this ConnId, so a superseded connection closing late cannot evict its
    // replacement, and the location clear is gated the same way: it belongs
    // to whichever connection currently holds the registry entry.
    if let Some(registration) = registration {
        let removed = state.connections.unregister(conn_id, &registration);
        if removed {
            if let Registration::Captain { captain_id } = &registration {
                state.locations.clear(captain_id);
            }
        }
    }

    tracing::info!(?conn_id, "WebSocket actor stopped");
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}

/// Decode and act on one inbound text frame.
async fn handle_text_frame(
    text: &str,
    conn_id: ConnId,
    tx: &ConnectionSender,
    state: &AppState,
    registration: &mut Option<Registration>,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(?conn_id, error = %e, "Malformed client frame dropped");
            return;
        }
    };

    match registration {
        None => authenticate(message, conn_id, tx, state, registration).await,
        Some(Registration::Captain { captain_id }) => {
            if let Some(sample) = message.location {
                let captain_id = captain_id.clone();
                dispatch::on_captain_location(state, &captain_id, sample).await;
            }
        }
        Some(_) => {
            // Location frames are meaningful only from captains
            if message.location.is_some() {
                tracing::debug!(?conn_id, "Location frame from non-captain dropped");
            }
        }
    }
}

/// Verify the credential on an unauthenticated connection and register it.
/// Failure leaves the connection in Connecting: the frame is dropped, the
/// channel stays open, and a later frame may still authenticate.
async fn authenticate(
    message: ClientMessage,
    conn_id: ConnId,
    tx: &ConnectionSender,
    state: &AppState,
    registration: &mut Option<Registration>,
) {
    let Some(token) = message.token.as_deref() else {
        tracing::debug!(?conn_id, "Frame without credential on unauthenticated connection");
        return;
    };

    let claims = match jwt::validate_access_token(&state.jwt_secret, token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(?conn_id, error = %e, "WebSocket credential rejected");
            return;
        }
    };

    if let Some(hint) = message.role.as_deref() {
        if hint != claims.role.as_str() {
            tracing::debug!(
                ?conn_id,
                hint = %hint,
                claimed = claims.role.as_str(),
                "Role hint differs from verified claim"
            );
        }
    }

    match claims.role {
        Role::Captain => {
            state
                .connections
                .register_captain(&claims.sub, conn_id, tx.clone());
            *registration = Some(Registration::Captain {
                captain_id: claims.sub.clone(),
            });
            // The registration frame may already carry a position
            if let Some(sample) = message.location {
                dispatch::on_captain_location(state, &claims.sub, sample).await;
            }
        }
        Role::User => {
            state
                .connections
                .register_rider(&claims.sub, conn_id, tx.clone());
            *registration = Some(Registration::Rider {
                rider_id: claims.sub.clone(),
            });
            if let Some(confirmation) = protocol::rider_confirmation() {
                let _ = tx.send(confirmation);
            }
        }
        Role::Admin => {
            state.connections.register_admin(conn_id, tx.clone());
            *registration = Some(Registration::Admin);
            send_snapshot(tx, state);
        }
    }

    tracing::info!(
        ?conn_id,
        participant_id = %claims.sub,
        role = claims.role.as_str(),
        "WebSocket connection authenticated"
    );
}

/// Send a newly-connected admin the full current captain-location snapshot,
/// filtered to captains that still hold a live registry entry.
fn send_snapshot(tx: &ConnectionSender, state: &AppState) {
    let entries: Vec<protocol::CaptainLocation> = state
        .locations
        .snapshot()
        .into_iter()
        .filter(|(captain_id, _)| state.connections.is_captain_connected(captain_id))
        .map(|(captain_id, location)| protocol::CaptainLocation {
            captain_id,
            location,
        })
        .collect();

    if let Some(frame) = protocol::snapshot(&entries) {
        let _ = tx.send(frame);
    }
}
