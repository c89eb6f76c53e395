use crate::directory::{LaunchCities, LaunchCity};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_LAUNCH_CITIES: &str =
    "Minneapolis,MN;Saint Paul,MN;Chicago,IL;Seattle,WA;Portland,OR";
const DEFAULT_PAGE_SIZE: usize = 20;
const DEFAULT_MAX_PAGE_SIZE: usize = 100;

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
    pub directory: DirectoryConfig,
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
        let log_format = LogFormat::parse(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        let launch_cities = parse_launch_cities(
            &env::var("APP_LAUNCH_CITIES").unwrap_or_else(|_| DEFAULT_LAUNCH_CITIES.to_string()),
        )?;
        let default_page_size = parse_page_size("APP_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let max_page_size = parse_page_size("APP_MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE)?;
        if default_page_size > max_page_size {
            return Err(ConfigError::InvalidPageSize {
                variable: "APP_DEFAULT_PAGE_SIZE",
            });
        }
        let seed_csv = env::var("APP_SEED_CSV")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            directory: DirectoryConfig {
                launch_cities,
                default_page_size,
                max_page_size,
                seed_csv,
            },
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
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidLogFormat {
                value: other.to_string(),
            }),
        }
    }
}

/// Directory visibility and paging settings.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub launch_cities: LaunchCities,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub seed_csv: Option<PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            launch_cities: parse_launch_cities(DEFAULT_LAUNCH_CITIES).unwrap_or_default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            seed_csv: None,
        }
    }
}

/// Parses `City,ST;City,ST` into the launch-city allow-list.
pub fn parse_launch_cities(raw: &str) -> Result<LaunchCities, ConfigError> {
    let mut cities = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (city, state) = entry
            .rsplit_once(',')
            .ok_or_else(|| ConfigError::InvalidLaunchCity {
                entry: entry.to_string(),
            })?;
        let city = LaunchCity::new(city, state).ok_or_else(|| ConfigError::InvalidLaunchCity {
            entry: entry.to_string(),
        })?;
        cities.push(city);
    }

    if cities.is_empty() {
        return Err(ConfigError::EmptyLaunchCities);
    }

    Ok(LaunchCities::new(cities))
}

fn parse_page_size(variable: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(variable) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(ConfigError::InvalidPageSize { variable }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat { value: String },
    InvalidLaunchCity { entry: String },
    EmptyLaunchCities,
    InvalidPageSize { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json', got '{value}'")
            }
            ConfigError::InvalidLaunchCity { entry } => write!(
                f,
                "APP_LAUNCH_CITIES entry '{entry}' must look like 'City,ST' with a 2-letter state"
            ),
            ConfigError::EmptyLaunchCities => {
                write!(f, "APP_LAUNCH_CITIES must name at least one city")
            }
            ConfigError::InvalidPageSize { variable } => {
                write!(f, "{variable} must be a positive integer within the page cap")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
