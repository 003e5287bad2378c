use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_QUALIFICATION_TTL_SECS: u64 = 15;
const MAX_QUALIFICATION_TTL_SECS: u64 = 120;

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    #[default]
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the dispatch service reads from its environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    /// `.env` first (when present), then the process environment. Blank values count as unset.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port = match setting("APP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort)?,
            None => DEFAULT_PORT,
        };
        let qualification_ttl = match setting("APP_QUALIFICATION_TTL_SECS") {
            Some(raw) => parse_ttl(&raw)?,
            None => Duration::from_secs(DEFAULT_QUALIFICATION_TTL_SECS),
        };

        Ok(Self {
            environment: setting("APP_ENV")
                .map(|raw| AppEnvironment::parse(&raw))
                .unwrap_or_default(),
            server: ServerConfig {
                host: setting("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
            telemetry: TelemetryConfig {
                log_level: setting("APP_LOG_LEVEL")
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            },
            dispatch: DispatchConfig { qualification_ttl },
        })
    }
}

fn setting(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// Seconds, never minutes.
fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if (1..=MAX_QUALIFICATION_TTL_SECS).contains(&secs) => {
            Ok(Duration::from_secs(secs))
        }
        _ => Err(ConfigError::InvalidQualificationTtl(raw.to_string())),
    }
}

/// HTTP bind settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Knobs for the dispatch read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Lifetime of a cached qualification result.
    pub qualification_ttl: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            qualification_ttl: Duration::from_secs(DEFAULT_QUALIFICATION_TTL_SECS),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidQualificationTtl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => f.write_str("APP_PORT is not a valid port number"),
            ConfigError::InvalidHost { source } => {
                write!(f, "APP_HOST is not an IP address or 'localhost' ({source})")
            }
            ConfigError::InvalidQualificationTtl(value) => write!(
                f,
                "APP_QUALIFICATION_TTL_SECS must be 1..={MAX_QUALIFICATION_TTL_SECS} seconds, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::InvalidQualificationTtl(_) => None,
        }
    }
}
