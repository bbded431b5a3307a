//! Process-environment configuration
//!
//! Configuration is read once at startup from environment variables.
//! Invalid values never abort startup: they are logged at warn level and
//! replaced by the documented default.

use tracing::warn;

/// Default allowed media file extensions (leading dot, lower-case)
const DEFAULT_EXTENSIONS: &[&str] = &[
    ".mp4", ".mkv", ".avi", ".mov", ".divx", ".mp3", ".m4a", ".flac", ".wma",
];

const DEFAULT_CONCURRENCY: usize = 10;
const DEFAULT_PORT: u16 = 8000;

/// Server configuration loaded from the process environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of in-flight scan calls (semaphore size), at least 1
    pub concurrency_limit: usize,
    /// Allowed media file extensions, leading dot, lower-case
    pub supported_extensions: Vec<String>,
    /// Allowed CORS origins; `*` means any origin
    pub allowed_origins: Vec<String>,
    /// Default log level when RUST_LOG is not set
    pub log_level: String,
    /// Port the HTTP listener binds to
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY,
            supported_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            allowed_origins: vec!["*".to_string()],
            log_level: "INFO".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let concurrency_limit =
            env_usize("CONCURRENCY_LIMIT", defaults.concurrency_limit).max(1);
        let supported_extensions =
            env_string_list("SUPPORTED_EXTENSIONS", defaults.supported_extensions);
        let allowed_origins = env_string_list("ALLOWED_ORIGINS", defaults.allowed_origins);
        let log_level = parse_log_level(
            std::env::var("LOG_LEVEL").unwrap_or_default(),
            defaults.log_level,
        );
        let port = env_u16("MEDIAWATCH_PORT", defaults.port);

        Self {
            concurrency_limit,
            supported_extensions,
            allowed_origins,
            log_level,
            port,
        }
    }

    /// Check whether a lower-cased, dot-prefixed extension is allowed
    pub fn extension_allowed(&self, ext: &str) -> bool {
        self.supported_extensions.iter().any(|e| e == ext)
    }
}

fn parse_log_level(raw: String, default: String) -> String {
    let trimmed = raw.trim().to_uppercase();
    match trimmed.as_str() {
        "" => default,
        "DEBUG" | "INFO" | "ERROR" => trimmed,
        "WARN" | "WARNING" => "WARN".to_string(),
        other => {
            warn!(
                invalid_value = other,
                default_value = default,
                "invalid LOG_LEVEL, using default"
            );
            default
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(raw) if !raw.is_empty() => match raw.parse() {
            Ok(v) => v,
            Err(e) => {
                warn!(key, invalid_value = raw, error = %e, "invalid integer env var, using default");
                default
            }
        },
        _ => default,
    }
}

fn env_u16(key: &str, default: u16) -> u16 {
    match std::env::var(key) {
        Ok(raw) if !raw.is_empty() => match raw.parse() {
            Ok(v) => v,
            Err(e) => {
                warn!(key, invalid_value = raw, error = %e, "invalid port env var, using default");
                default
            }
        },
        _ => default,
    }
}

fn env_string_list(key: &str, default: Vec<String>) -> Vec<String> {
    let raw = match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => return default,
    };

    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    if items.is_empty() {
        warn!(key, original_value = raw, "env var resulted in an empty list, using default");
        return default;
    }
    items
}
