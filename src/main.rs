mod auth;
mod config;
mod db;
mod notify;
mod orders;
mod routes;
mod state;
mod tracking;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use config::{generate_config_template, Config};
use notify::push::PushClient;
use tracking::store::LocationStore;
use ws::registry::ConnectionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "mishwar_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "mishwar_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("Mishwar server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    // Load or generate JWT signing key (256-bit random, stored in data_dir)
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    if config.fcm_server_key.is_none() {
        tracing::info!("No FCM server key configured, push notifications disabled");
    }

    // Build application state: registry and location store start empty
    let app_state = state::AppState {
        db,
        jwt_secret,
        connections: Arc::new(ConnectionRegistry::new()),
        locations: Arc::new(LocationStore::new()),
        push: Arc::new(PushClient::new(config.fcm_server_key.clone())),
    };

    // Start the periodic location sweep
    tracking::sweep::spawn_location_sweep(app_state.clone(), config.sweep_interval_secs);

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve. A bind failure is the only fatal error path.
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
