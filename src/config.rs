use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::reputation::ReputationThresholds;

const ENV_PREFIX: &str = "EDUSHARE_";

/// Minimum length of the token signing secret, in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// One hundred years
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 100;

/// Configuration for the EduShare API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Bearer token configuration
    pub auth: AuthConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Uploaded file storage
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Reputation system configuration
    pub reputation: ReputationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Rate limit per minute per IP (0 disables limiting)
    pub rate_limit_per_minute: u32,
    /// Enable permissive CORS
    pub enable_cors: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. Required, never defaulted.
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub token_ttl_hours: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL (if false, uses the in-memory store)
    pub postgres_enabled: bool,
    /// Connection pool size
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded files are written to
    pub upload_dir: String,
    /// Maximum request body size in bytes, multipart uploads included
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Enable request/response logging
    pub log_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Contribution points per published material
    pub upload_points: u64,
    /// Ratings needed on one material before its uploader can become Expert
    pub expert_min_ratings: usize,
    /// Average rating needed on that material
    pub expert_min_average: f64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        let thresholds = ReputationThresholds::default();
        Self {
            upload_points: thresholds.upload_points,
            expert_min_ratings: thresholds.expert_min_ratings,
            expert_min_average: thresholds.expert_min_average,
        }
    }
}

impl ReputationConfig {
    /// Convert to ReputationThresholds for use by ReputationManager
    pub fn to_thresholds(&self) -> ReputationThresholds {
        ReputationThresholds {
            upload_points: self.upload_points,
            expert_min_ratings: self.expert_min_ratings,
            expert_min_average: self.expert_min_average,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/edushare".to_string(),
            postgres_enabled: false,
            max_connections: 10,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            security: SecurityConfig {
                rate_limit_per_minute: 120,
                enable_cors: true,
            },
            auth: AuthConfig {
                jwt_secret: String::new(), // Must be set via environment
                token_ttl_hours: 24,
            },
            database: DatabaseConfig::default(),
            storage: StorageConfig {
                upload_dir: "uploads".to_string(),
                max_upload_bytes: 25 * 1024 * 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                log_requests: true,
            },
            reputation: ReputationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `EDUSHARE_*` environment variables and validate it
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. Keys are full variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = EnvVars { lookup: &lookup };
        let mut config = Self::default();

        // Server configuration
        if let Some(host) = vars.get("HOST") {
            config.server.host = host;
        }
        vars.parse_into("PORT", &mut config.server.port)?;

        // Security configuration
        vars.parse_into("RATE_LIMIT_PER_MINUTE", &mut config.security.rate_limit_per_minute)?;
        vars.parse_into("ENABLE_CORS", &mut config.security.enable_cors)?;

        // Token configuration
        config.auth.jwt_secret = vars
            .get("JWT_SECRET")
            .context("EDUSHARE_JWT_SECRET environment variable is required")?;
        vars.parse_into("TOKEN_TTL_HOURS", &mut config.auth.token_ttl_hours)?;

        // Database configuration
        if let Some(url) = vars.get("POSTGRES_URL") {
            config.database.postgres_url = url;
        }
        vars.parse_into("POSTGRES_ENABLED", &mut config.database.postgres_enabled)?;
        vars.parse_into("POSTGRES_MAX_CONNECTIONS", &mut config.database.max_connections)?;

        // Storage configuration
        if let Some(dir) = vars.get("UPLOAD_DIR") {
            config.storage.upload_dir = dir;
        }
        vars.parse_into("MAX_UPLOAD_BYTES", &mut config.storage.max_upload_bytes)?;

        // Logging configuration
        if let Some(level) = vars.get("LOG_LEVEL") {
            config.logging.level = level;
        }
        vars.parse_into("LOG_REQUESTS", &mut config.logging.log_requests)?;

        // Reputation configuration
        vars.parse_into("UPLOAD_POINTS", &mut config.reputation.upload_points)?;
        vars.parse_into("EXPERT_MIN_RATINGS", &mut config.reputation.expert_min_ratings)?;
        vars.parse_into("EXPERT_MIN_AVERAGE", &mut config.reputation.expert_min_average)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for security and consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT secret is too short (minimum {} bytes)",
                MIN_JWT_SECRET_LEN
            ));
        }

        if self.auth.token_ttl_hours <= 0 {
            return Err(anyhow::anyhow!("Token lifetime must be positive"));
        }

        if self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(anyhow::anyhow!(
                "Token lifetime is too long (maximum {} hours)",
                MAX_TOKEN_TTL_HOURS
            ));
        }

        if self.database.postgres_enabled && self.database.postgres_url.is_empty() {
            return Err(anyhow::anyhow!(
                "PostgreSQL is enabled but no connection URL is configured"
            ));
        }

        if self.storage.upload_dir.is_empty() {
            return Err(anyhow::anyhow!("Upload directory cannot be empty"));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum upload size must be non-zero"));
        }

        let min_average = self.reputation.expert_min_average;
        if !(1.0..=5.0).contains(&min_average) {
            return Err(anyhow::anyhow!(
                "Expert minimum average must be between 1 and 5, got {}",
                min_average
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Prefixed variable lookup with parse errors naming the variable
struct EnvVars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvVars<'_> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&format!("{}{}", ENV_PREFIX, name))
    }

    fn parse_into<T>(&self, name: &str, target: &mut T) -> Result<()>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        if let Some(raw) = self.get(name) {
            *target = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}{} value", ENV_PREFIX, name))?;
        }
        Ok(())
    }
}
