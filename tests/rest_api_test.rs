//! Integration tests for the REST surface: captain order overview and
//! notification save-and-push.

use rusqlite::params;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use mishwar_server::auth::jwt::{issue_access_token, Role};
use mishwar_server::db::DbPool;
use mishwar_server::notify::push::PushClient;
use mishwar_server::state::AppState;
use mishwar_server::tracking::store::LocationStore;
use mishwar_server::ws::registry::ConnectionRegistry;

struct TestServer {
    base_url: String,
    db: DbPool,
    jwt_secret: Vec<u8>,
    _tmp_dir: tempfile::TempDir,
}

async fn start_test_server() -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = mishwar_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = mishwar_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = AppState {
        db: db.clone(),
        jwt_secret: jwt_secret.clone(),
        connections: Arc::new(ConnectionRegistry::new()),
        locations: Arc::new(LocationStore::new()),
        push: Arc::new(PushClient::new(None)),
    };

    let app = mishwar_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        db,
        jwt_secret,
        _tmp_dir: tmp_dir,
    }
}

fn seed_user(db: &DbPool, id: &str, name: &str, location: Option<(f64, f64)>) {
    let conn = db.lock().unwrap();
    let (lat, lng) = match location {
        Some((lat, lng)) => (Some(lat), Some(lng)),
        None => (None, None),
    };
    conn.execute(
        "INSERT INTO users (id, name, role, location_lat, location_lng, created_at, updated_at)
         VALUES (?1, ?2, 'user', ?3, ?4, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        params![id, name, lat, lng],
    )
    .unwrap();
}

fn seed_order(
    db: &DbPool,
    order_id: &str,
    captain: &str,
    rider: &str,
    destination: (f64, f64),
    created_at: &str,
) {
    let conn = db.lock().unwrap();
    conn.execute(
        "INSERT INTO taxi_orders (id, captain_id, user_id, destination_lat, destination_lng, cancelled, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        params![order_id, captain, rider, destination.0, destination.1, created_at],
    )
    .unwrap();
}

fn token(server: &TestServer, id: &str, role: Role) -> String {
    issue_access_token(&server.jwt_secret, id, role).expect("Failed to issue token")
}

#[tokio::test]
async fn test_rider_locations_for_captain() {
    let server = start_test_server().await;
    seed_user(&server.db, "C1", "Captain One", None);
    seed_user(&server.db, "U1", "Rider One", Some((31.2, 29.9)));
    seed_user(&server.db, "U2", "Rider Two", None);
    // Two active orders sharing one destination, newest first in the response
    seed_order(&server.db, "o1", "C1", "U1", (10.0, 20.0), "2026-01-01T10:00:00Z");
    seed_order(&server.db, "o2", "C1", "U2", (10.0, 20.0), "2026-01-02T10:00:00Z");
    {
        let conn = server.db.lock().unwrap();
        conn.execute(
            "INSERT INTO order_passengers (order_id, user_id) VALUES ('o1', 'U2')",
            [],
        )
        .unwrap();
    }

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/orders/rider-locations", server.base_url))
        .bearer_auth(token(&server, "C1", Role::Captain))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let riders = body["riders"].as_array().unwrap();
    // o2 (newest) contributes U2, then o1 contributes U1 + passenger U2
    let ids: Vec<&str> = riders.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["U2", "U1", "U2"]);
    assert_eq!(riders[1]["location"]["lat"], 31.2);
    assert!(riders[0]["location"].is_null());

    // Shared destination is deduplicated to a single numbered entry
    let destinations = body["destinations"].as_array().unwrap();
    assert_eq!(destinations.len(), 1);
    assert_eq!(destinations[0]["id"], "destination1");
    assert_eq!(destinations[0]["location"]["lat"], 10.0);
}

#[tokio::test]
async fn test_rider_locations_requires_captain_role() {
    let server = start_test_server().await;
    seed_user(&server.db, "U1", "Rider One", None);

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/orders/rider-locations", server.base_url))
        .bearer_auth(token(&server, "U1", Role::User))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // No token at all
    let resp = client
        .get(format!("{}/api/orders/rider-locations", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_send_notification_saves_row_without_push_key() {
    let server = start_test_server().await;
    seed_user(&server.db, "U1", "Rider One", None);
    {
        let conn = server.db.lock().unwrap();
        conn.execute(
            "INSERT INTO notification_tokens (id, user_id, token, created_at)
             VALUES ('t1', 'U1', 'device-token-1', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
    }

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/notifications/send", server.base_url))
        .bearer_auth(token(&server, "C1", Role::Captain))
        .json(&serde_json::json!({
            "user_id": "U1",
            "title": "Captain arrived",
            "body": "Your ride is waiting outside",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Notification sent and saved successfully.");

    // The notification row is persisted even though no FCM key is configured
    let (count, title): (i64, String) = {
        let conn = server.db.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*), MAX(title) FROM notifications WHERE user_id = 'U1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    };
    assert_eq!(count, 1);
    assert_eq!(title, "Captain arrived");
}

#[tokio::test]
async fn test_send_notification_requires_auth() {
    let server = start_test_server().await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/notifications/send", server.base_url))
        .json(&serde_json::json!({
            "user_id": "U1",
            "title": "t",
            "body": "b",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_health_check() {
    let server = start_test_server().await;

    let resp = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}
