//! Best-effort push delivery to offline devices through FCM.
//!
//! Delivery is store-and-forward: the notification row is persisted
//! regardless, and push failures are counted and logged, never surfaced to
//! the caller. Without a configured server key the client logs and skips.

use serde::Deserialize;

const FCM_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

pub struct PushClient {
    http: reqwest::Client,
    server_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    success: u64,
    #[serde(default)]
    failure: u64,
}

impl PushClient {
    pub fn new(server_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_key,
        }
    }

    /// Multicast a notification to the given device tokens.
    /// Returns the number of successful sends reported by FCM.
    pub async fn send_to_tokens(&self, tokens: &[String], title: &str, body: &str) -> u64 {
        if tokens.is_empty() {
            return 0;
        }
        let Some(server_key) = &self.server_key else {
            tracing::debug!(
                tokens = tokens.len(),
                "No FCM server key configured, skipping push"
            );
            return 0;
        };

        let payload = serde_json::json!({
            "registration_ids": tokens,
            "notification": {
                "title": title,
                "body": body,
            },
        });

        let result = self
            .http
            .post(FCM_ENDPOINT)
            .header("Authorization", format!("key={}", server_key))
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<FcmResponse>().await {
                    Ok(report) => {
                        tracing::info!(
                            success = report.success,
                            failure = report.failure,
                            "Push notifications sent"
                        );
                        report.success
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Unreadable FCM response");
                        0
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "FCM rejected push request");
                0
            }
            Err(e) => {
                tracing::warn!(error = %e, "FCM request failed");
                0
            }
        }
    }
}
