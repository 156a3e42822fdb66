//! JSON wire protocol for the relay WebSocket.
//!
//! Inbound frames are a single flat object: a credential on the first
//! meaningful message, and (for captains) a location on any message.
//! Outbound frames are status messages, `{captainId, location}` pushes, and
//! the admin initial snapshot as one JSON array of pushes.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::tracking::store::LocationSample;

/// Greeting sent on every new connection, before authentication.
pub const GREETING: &str = "Connection successful!";

/// Confirmation sent to a rider after successful authentication.
pub const RIDER_CONFIRMATION: &str = "User added successfully!";

/// Inbound client frame. `token` is required on the first meaningful
/// message; `role` is an uninspected hint (the verified claims win);
/// `location` is meaningful only once authenticated as a captain.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub token: Option<String>,
    pub role: Option<String>,
    pub location: Option<LocationSample>,
}

/// Outbound informational frame: `{"message": "..."}`.
#[derive(Debug, Serialize)]
struct StatusMessage<'a> {
    message: &'a str,
}

/// Outbound location push: `{"captainId": "...", "location": {...}}`.
/// Also the element type of the admin snapshot array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptainLocation {
    #[serde(rename = "captainId")]
    pub captain_id: String,
    pub location: LocationSample,
}

/// Serialize a payload into a text frame. A serialization failure skips the
/// send; these payload types have no fallible fields in practice.
fn to_message<T: Serialize>(payload: &T) -> Option<Message> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize outbound frame");
            None
        }
    }
}

/// `{"message": "Connection successful!"}`
pub fn greeting() -> Option<Message> {
    to_message(&StatusMessage { message: GREETING })
}

/// `{"message": "User added successfully!"}`
pub fn rider_confirmation() -> Option<Message> {
    to_message(&StatusMessage {
        message: RIDER_CONFIRMATION,
    })
}

/// One `{captainId, location}` push frame.
pub fn location_update(captain_id: &str, sample: &LocationSample) -> Option<Message> {
    to_message(&CaptainLocation {
        captain_id: captain_id.to_string(),
        location: sample.clone(),
    })
}

/// The admin initial snapshot: one frame holding the whole array.
pub fn snapshot(entries: &[CaptainLocation]) -> Option<Message> {
    to_message(&entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_update_uses_wire_field_names() {
        let msg = location_update("c1", &LocationSample::new(1.0, 2.0)).unwrap();
        let Message::Text(text) = msg else {
            panic!("expected text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["captainId"], "c1");
        assert_eq!(value["location"]["lat"], 1.0);
        assert_eq!(value["location"]["lng"], 2.0);
    }

    #[test]
    fn client_message_fields_are_optional() {
        let msg: ClientMessage = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(msg.token.as_deref(), Some("abc"));
        assert!(msg.role.is_none());
        assert!(msg.location.is_none());
    }
}
