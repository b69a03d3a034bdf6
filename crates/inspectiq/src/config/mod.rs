use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::approvals::PollSettings;
use crate::workflows::inspections::AnalysisConfig;

/// Upper bound on the future-date tolerance, one leap year.
const MAX_FUTURE_TOLERANCE_HOURS: i64 = 24 * 366;

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

/// Top-level configuration for the inspection service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub approvals: ApprovalConfig,
    pub analysis: AnalysisConfig,
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
        let ansi = parse_var("APP_LOG_ANSI", false)?;

        let public_base_url = env::var("APP_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();
        if !(public_base_url.starts_with("http://") || public_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl {
                key: "APP_PUBLIC_BASE_URL",
            });
        }
        let evidence_base_url =
            env::var("APP_EVIDENCE_BASE_URL").unwrap_or_else(|_| "https://".to_string());

        let poll_interval_secs: u64 = parse_var("APPROVAL_POLL_INTERVAL_SECS", 5)?;
        let poll_timeout_secs: u64 = parse_var("APPROVAL_POLL_TIMEOUT_SECS", 600)?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "APPROVAL_POLL_INTERVAL_SECS",
            });
        }

        let defaults = AnalysisConfig::default();
        let analysis = AnalysisConfig {
            mismatch_meters: parse_var("GEOFENCE_MISMATCH_METERS", defaults.mismatch_meters)?,
            warning_meters: parse_var("GEOFENCE_WARNING_METERS", defaults.warning_meters)?,
            future_tolerance_hours: parse_var(
                "FUTURE_DATE_TOLERANCE_HOURS",
                defaults.future_tolerance_hours,
            )?,
            brief_feedback_chars: parse_var("BRIEF_FEEDBACK_CHARS", defaults.brief_feedback_chars)?,
        };
        for (key, meters) in [
            ("GEOFENCE_MISMATCH_METERS", analysis.mismatch_meters),
            ("GEOFENCE_WARNING_METERS", analysis.warning_meters),
        ] {
            if !meters.is_finite() || meters < 0.0 {
                return Err(ConfigError::InvalidNumber { key });
            }
        }
        if analysis.warning_meters > analysis.mismatch_meters {
            return Err(ConfigError::InvalidNumber {
                key: "GEOFENCE_WARNING_METERS",
            });
        }
        if !(0..=MAX_FUTURE_TOLERANCE_HOURS).contains(&analysis.future_tolerance_hours) {
            return Err(ConfigError::InvalidNumber {
                key: "FUTURE_DATE_TOLERANCE_HOURS",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            approvals: ApprovalConfig {
                public_base_url,
                evidence_base_url,
                polling: PollSettings {
                    interval: Duration::from_secs(poll_interval_secs),
                    timeout: Duration::from_secs(poll_timeout_secs),
                },
            },
            analysis,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        _ => Ok(default),
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
    pub ansi: bool,
}

/// Consent handshake settings: where verification links point and how clients poll.
#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    pub public_base_url: String,
    pub evidence_base_url: String,
    pub polling: PollSettings,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidUrl { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a valid, positive number")
            }
            ConfigError::InvalidUrl { key } => {
                write!(f, "{key} must be an http:// or https:// URL")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidUrl { .. } => None,
        }
    }
}
