//! API Configuration Module
//!
//! Bind address, CORS, rate limiting and the admin token. Loaded from
//! environment variables with defaults suited to local development.

use std::net::SocketAddr;

use finquery_core::config::env_parse;
use finquery_core::ConfigError;

/// HTTP-layer configuration.
#[derive(Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Listener
    // ========================================================================
    pub host: String,
    pub port: u16,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    pub rate_limit_enabled: bool,

    /// Requests per minute for one tenant.
    pub rate_limit_per_tenant: u32,

    /// Requests per minute for one client IP when no tenant is known.
    pub rate_limit_per_ip: u32,

    /// Burst capacity on top of the steady rate.
    pub rate_limit_burst: u32,

    /// Most buckets tracked at once. New keys beyond this share one
    /// overflow bucket until idle buckets are evicted.
    pub rate_limit_max_keys: usize,

    // ========================================================================
    // Administration
    // ========================================================================
    /// Token required in `x-admin-token` for cache invalidation. `None`
    /// disables the endpoint.
    pub admin_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            rate_limit_enabled: true,
            rate_limit_per_tenant: 30,
            rate_limit_per_ip: 100,
            rate_limit_burst: 5,
            rate_limit_max_keys: 10_000,
            admin_token: None,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field("rate_limit_per_tenant", &self.rate_limit_per_tenant)
            .field("rate_limit_per_ip", &self.rate_limit_per_ip)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("rate_limit_max_keys", &self.rate_limit_max_keys)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `FINQUERY_API_BIND`: listen host (default: 0.0.0.0)
    /// - `PORT` or `FINQUERY_API_PORT`: listen port (default: 3000)
    /// - `FINQUERY_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `FINQUERY_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `FINQUERY_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    /// - `FINQUERY_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `FINQUERY_RATE_LIMIT_PER_TENANT`: requests per minute per tenant (default: 30)
    /// - `FINQUERY_RATE_LIMIT_PER_IP`: requests per minute per IP (default: 100)
    /// - `FINQUERY_RATE_LIMIT_BURST`: burst capacity (default: 5)
    /// - `FINQUERY_RATE_LIMIT_MAX_KEYS`: most tracked buckets (default: 10000)
    /// - `FINQUERY_ADMIN_TOKEN`: enables `DELETE /api/cache`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(_) => env_parse("PORT", defaults.port)?,
            Err(_) => env_parse("FINQUERY_API_PORT", defaults.port)?,
        };

        let cors_origins = std::env::var("FINQUERY_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: std::env::var("FINQUERY_API_BIND").unwrap_or(defaults.host),
            port,
            cors_origins,
            cors_allow_credentials: env_flag("FINQUERY_CORS_ALLOW_CREDENTIALS", false),
            cors_max_age_secs: env_parse("FINQUERY_CORS_MAX_AGE_SECS", defaults.cors_max_age_secs)?,
            rate_limit_enabled: env_flag("FINQUERY_RATE_LIMIT_ENABLED", true),
            rate_limit_per_tenant: env_parse(
                "FINQUERY_RATE_LIMIT_PER_TENANT",
                defaults.rate_limit_per_tenant,
            )?,
            rate_limit_per_ip: env_parse("FINQUERY_RATE_LIMIT_PER_IP", defaults.rate_limit_per_ip)?,
            rate_limit_burst: env_parse("FINQUERY_RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            rate_limit_max_keys: env_parse(
                "FINQUERY_RATE_LIMIT_MAX_KEYS",
                defaults.rate_limit_max_keys,
            )?,
            admin_token: std::env::var("FINQUERY_ADMIN_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
        })
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
            field: "FINQUERY_API_BIND".to_string(),
            value: addr.clone(),
            reason: e.to_string(),
        })
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    pub fn with_rate_limit(mut self, per_minute: u32, burst: u32) -> Self {
        self.rate_limit_enabled = true;
        self.rate_limit_per_tenant = per_minute;
        self.rate_limit_per_ip = per_minute;
        self.rate_limit_burst = burst;
        self
    }

    pub fn with_rate_limit_max_keys(mut self, max_keys: usize) -> Self {
        self.rate_limit_max_keys = max_keys;
        self
    }

    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limit_enabled = false;
        self
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_per_tenant, 30);
        assert!(config.admin_token.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_bind_addr() {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");

        let bad = ApiConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            bad.bind_addr(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "FINQUERY_API_BIND"
        ));
    }

    #[test]
    fn test_debug_redacts_admin_token() {
        let config = ApiConfig::default().with_admin_token("s3cret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_env_flag_falls_back_on_garbage() {
        assert!(env_flag("FINQUERY_TEST_SURELY_UNSET_FLAG", true));
        assert!(!env_flag("FINQUERY_TEST_SURELY_UNSET_FLAG", false));
    }
}
