use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: BackendConfig,
    pub share: ShareConfig,
    pub roster: RosterConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("KNOCK_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("KNOCK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("KNOCK_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("KNOCK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let backend = BackendConfig {
            url: required_url("KNOCK_BACKEND_URL")?,
            anon_key: required("KNOCK_BACKEND_ANON_KEY")?,
            request_timeout: Duration::from_secs(number("KNOCK_BACKEND_TIMEOUT_SECS", 10)?),
            photo_bucket: env::var("KNOCK_PHOTO_BUCKET")
                .unwrap_or_else(|_| PhotoDefaults::BUCKET.to_string()),
            photo_max_bytes: number("KNOCK_PHOTO_MAX_BYTES", PhotoDefaults::MAX_BYTES)?,
        };

        let public_origin = match env::var("KNOCK_PUBLIC_ORIGIN") {
            Ok(origin) => {
                parse_url("KNOCK_PUBLIC_ORIGIN", &origin)?;
                origin.trim_end_matches('/').to_string()
            }
            Err(_) => format!("http://localhost:{port}"),
        };

        let share = ShareConfig {
            public_origin,
            dismiss_after: Duration::from_millis(number("KNOCK_SHARE_DISMISS_MS", 2_000)?),
        };

        let roster = RosterConfig {
            cache_ttl: Duration::from_secs(number("KNOCK_ROSTER_CACHE_SECS", 30)?),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend,
            share,
            roster,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection to the hosted data, auth, functions and storage APIs.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project URL without a trailing slash, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Public API key sent as `apikey` on every request.
    pub anon_key: String,
    pub request_timeout: Duration,
    pub photo_bucket: String,
    pub photo_max_bytes: usize,
}

struct PhotoDefaults;

impl PhotoDefaults {
    const BUCKET: &'static str = "technician-photos";
    const MAX_BYTES: usize = 5 * 1024 * 1024;
}

/// Share link construction and the success display delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareConfig {
    pub public_origin: String,
    pub dismiss_after: Duration,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            public_origin: "http://localhost:3000".to_string(),
            dismiss_after: Duration::from_secs(2),
        }
    }
}

/// Staleness window of the per-company technician list cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterConfig {
    pub cache_ttl: Duration,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
        }
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn required_url(var: &'static str) -> Result<String, ConfigError> {
    let raw = required(var)?;
    parse_url(var, &raw)?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_url(var: &'static str, raw: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(raw.trim()).map_err(|err| ConfigError::InvalidUrl {
        var,
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ConfigError::UnsupportedScheme {
            var,
            scheme: url.scheme().to_string(),
        }),
    }
}

fn number<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    Missing(&'static str),
    InvalidUrl { var: &'static str, reason: String },
    UnsupportedScheme { var: &'static str, scheme: String },
    InvalidNumber { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "KNOCK_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "KNOCK_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::Missing(var) => write!(f, "{} must be set", var),
            ConfigError::InvalidUrl { var, reason } => {
                write!(f, "{} must be an absolute URL ({})", var, reason)
            }
            ConfigError::UnsupportedScheme { var, scheme } => {
                write!(f, "{} must use http or https, got '{}'", var, scheme)
            }
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{} must be a non-negative integer, got '{}'", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::Missing(_)
            | ConfigError::InvalidUrl { .. }
            | ConfigError::UnsupportedScheme { .. }
            | ConfigError::InvalidNumber { .. } => None,
        }
    }
}
