use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the scoring pipeline and report archiving.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Leading segment of generated report codes.
    pub report_prefix: String,
    /// Allowed distance of the criterion weight sum from 1.0 before a warning is logged.
    pub weight_tolerance: f64,
}

impl ScoringConfig {
    pub const DEFAULT_PREFIX: &'static str = "RPT";
    pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 0.001;

    fn from_env() -> Result<Self, ConfigError> {
        let report_prefix = env::var("PROFITRACK_REPORT_PREFIX")
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|_| Self::DEFAULT_PREFIX.to_string());
        if report_prefix.is_empty()
            || !report_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidReportPrefix);
        }

        let weight_tolerance = match env::var("PROFITRACK_WEIGHT_TOLERANCE") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite() && *value >= 0.0)
                .ok_or(ConfigError::InvalidWeightTolerance)?,
            Err(_) => Self::DEFAULT_WEIGHT_TOLERANCE,
        };

        Ok(Self {
            report_prefix,
            weight_tolerance,
        })
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            report_prefix: Self::DEFAULT_PREFIX.to_string(),
            weight_tolerance: Self::DEFAULT_WEIGHT_TOLERANCE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidReportPrefix,
    InvalidWeightTolerance,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidReportPrefix => write!(
                f,
                "PROFITRACK_REPORT_PREFIX must be non-empty ASCII letters, digits, or '_'"
            ),
            ConfigError::InvalidWeightTolerance => write!(
                f,
                "PROFITRACK_WEIGHT_TOLERANCE must be a non-negative number"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidReportPrefix
            | ConfigError::InvalidWeightTolerance => None,
        }
    }
}
