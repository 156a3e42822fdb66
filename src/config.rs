use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Mishwar location relay server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "mishwar-server", version, about = "Mishwar taxi location relay server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "MISHWAR_PORT", default_value = "8080")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "MISHWAR_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./mishwar.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "MISHWAR_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (DB, keys)
    #[arg(long, env = "MISHWAR_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Seconds between location sweep ticks (re-push of cached captain
    /// locations to connected riders)
    #[arg(long, env = "MISHWAR_SWEEP_INTERVAL_SECS", default_value = "10")]
    pub sweep_interval_secs: u64,

    /// FCM server key for push notifications. Push is skipped when unset.
    #[arg(long, env = "MISHWAR_FCM_SERVER_KEY")]
    pub fcm_server_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            config: "./mishwar.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            sweep_interval_secs: 10,
            fcm_server_key: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (MISHWAR_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("MISHWAR_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Mishwar Location Relay Server Configuration
# Place this file at ./mishwar.toml or specify with --config <path>
# All settings can be overridden via environment variables (MISHWAR_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for SQLite database and JWT signing key
# data_dir = "./data"

# Seconds between location sweep ticks. Riders who connect between two
# captain pushes receive the cached location within one interval.
# sweep_interval_secs = 10

# FCM server key for push notifications. Leave unset to disable push;
# notifications are still saved.
# fcm_server_key = ""
"#
    .to_string()
}
