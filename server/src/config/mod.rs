use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use tracing::{info, warn};

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_EVENTS_API_URL: &str = "https://www.pop-agenda.nl/wp-json/wp/v2/events";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub url: String,
    pub anon_key: String,
    /// Where the provider sends the browser after email confirmation or OAuth.
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
    pub events_api_url: String,
    pub cors_allowed_origins: String,
    /// Production turns on HSTS.
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: var_or("DATABASE_URL", "postgres://localhost/concertcircle"),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5),
            bind_addr: parse_or(
                "BIND_ADDR",
                DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3001))),
            ),
            auth: AuthConfig {
                url: var_or("AUTH_URL", "http://localhost:54321"),
                anon_key: var_or("AUTH_ANON_KEY", ""),
                redirect_url: var_or("AUTH_REDIRECT_URL", "http://localhost:3000/auth/callback"),
            },
            events_api_url: var_or("EVENTS_API_URL", DEFAULT_EVENTS_API_URL),
            cors_allowed_origins: var_or("CORS_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS),
            production: env::var("RUST_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default");
        default.to_string()
    })
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}; using {default}");
            default
        }),
        Err(_) => default,
    }
}
