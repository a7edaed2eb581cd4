// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the exam backend, without the `/api` prefix.
    pub backend_url: String,
    /// Alternate port the realtime service listens on.
    pub realtime_port: u16,
    pub listen_addr: String,
    /// JSON file holding persisted operator sessions.
    pub session_file: String,
    pub session_cookie: String,
    pub reconnect_delay: Duration,
    pub request_timeout: Duration,
    pub rust_log: String,
    /// Problems found while reading the environment. Logged by the caller
    /// once tracing is up.
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let mut warnings = Vec::new();

        let backend_url = env::var("BACKEND_URL")
            .expect("BACKEND_URL must be set")
            .trim_end_matches('/')
            .to_string();

        let realtime_port = parse_or("REALTIME_PORT", 8080, &mut warnings);

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let session_file =
            env::var("SESSION_FILE").unwrap_or_else(|_| "data/session.json".to_string());

        let session_cookie =
            env::var("SESSION_COOKIE").unwrap_or_else(|_| "medxam_session".to_string());

        let reconnect_delay = Duration::from_millis(parse_or("RECONNECT_DELAY_MS", 3000, &mut warnings));

        let request_timeout = Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 15, &mut warnings));

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            backend_url,
            realtime_port,
            listen_addr,
            session_file,
            session_cookie,
            reconnect_delay,
            request_timeout,
            rust_log,
            warnings,
        }
    }

    /// Configuration pointing at a given backend, with defaults elsewhere.
    /// Used by tests and embedders that do not read the environment.
    pub fn for_backend(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            realtime_port: 8080,
            listen_addr: "127.0.0.1:0".to_string(),
            session_file: "data/session.json".to_string(),
            session_cookie: "medxam_session".to_string(),
            reconnect_delay: Duration::from_millis(3000),
            request_timeout: Duration::from_secs(15),
            rust_log: "info".to_string(),
            warnings: Vec::new(),
        }
    }
}

fn parse_or<T>(key: &str, default: T, warnings: &mut Vec<String>) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    parse_value(key, env::var(key).ok(), default, warnings)
}

fn parse_value<T>(key: &str, raw: Option<String>, default: T, warnings: &mut Vec<String>) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warnings.push(format!("{} has invalid value '{}', using {}", key, raw, default));
        default
    })
}
