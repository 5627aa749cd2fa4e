//! Startup settings for the benefits service, read once from
//! `BENEFITS_*` environment variables. A `.env` file is honored so local
//! runs need no exported environment.

use std::env;
use std::net::{AddrParseError, SocketAddr};

/// How the service is being run. Local runs seed the demo agreement by
/// default; production starts empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Local,
    Production,
}

impl RuntimeMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: RuntimeMode,
    /// Address the HTTP server binds, `BENEFITS_LISTEN`.
    pub listen: SocketAddr,
    /// Tracing directives, `BENEFITS_LOG`, e.g. `info` or
    /// `union_benefits=debug,info`.
    pub log_directives: String,
    /// Whether to load the built-in demo agreement on startup,
    /// `BENEFITS_SEED_DEMO`. Defaults to the mode's behavior.
    pub seed_demo: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();

        let mode = RuntimeMode::parse(&env::var("BENEFITS_MODE").unwrap_or_default());

        let listen = parse_listen(
            &env::var("BENEFITS_LISTEN").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
        )?;

        let log_directives = env::var("BENEFITS_LOG").unwrap_or_else(|_| "info".to_string());

        let seed_demo = match env::var("BENEFITS_SEED_DEMO") {
            Ok(raw) => parse_flag(&raw).ok_or(SettingsError::SeedDemoFlag(raw))?,
            Err(_) => mode == RuntimeMode::Local,
        };

        Ok(Self {
            mode,
            listen,
            log_directives,
            seed_demo,
        })
    }
}

fn parse_listen(raw: &str) -> Result<SocketAddr, SettingsError> {
    let trimmed = raw.trim();
    // SocketAddr wants an IP literal; accept the common localhost spelling.
    let rewritten = trimmed
        .strip_prefix("localhost:")
        .map(|port| format!("127.0.0.1:{port}"));

    rewritten
        .as_deref()
        .unwrap_or(trimmed)
        .parse()
        .map_err(|source| SettingsError::ListenAddress {
            value: raw.to_string(),
            source,
        })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("BENEFITS_LISTEN '{value}' is not a host:port address")]
    ListenAddress {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("BENEFITS_SEED_DEMO '{0}' is not a boolean flag")]
    SeedDemoFlag(String),
}
