//! Pushgate binary entry point.

use pushgate_server::ServerConfig;
use std::env;
use std::net::SocketAddr;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    pushgate_http::start_server(load_config()).await
}

fn load_config() -> ServerConfig {
    let port: u16 = env_or("PUSHGATE_PORT", 8081);
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));

    let mut config = ServerConfig::new(bind_addr)
        .with_timezone_offset(env_or("PUSHGATE_TZ_OFFSET", 0))
        .with_poll_delay(env_or("PUSHGATE_POLL_DELAY", 10));

    if let Ok(version) = env::var("PUSHGATE_PUSH_VERSION") {
        config = config.with_push_version(version);
    }
    config
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("invalid {key} value {value:?}, using default");
            default
        }),
        Err(_) => default,
    }
}
