use crate::error::{ConfigError, ConfigResult};

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to component constructors; nothing
/// below the binary reads the environment directly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,

    // Extraction service
    pub extraction_service_url: String,
    pub extraction_api_key: Option<String>,
    /// `v2` or `legacy`; parsed by the extraction client.
    pub extraction_endpoint: String,
    pub extraction_max_attempts: u32,
    pub extraction_retry_base_ms: u64,
    pub http_timeout_secs: u64,

    // Auth
    pub jwt_secret: Option<String>,
    pub dev_auth_bypass: bool,

    // Web server
    pub api_host: String,
    pub api_port: u16,
    pub import_rate_limit_per_hour: usize,
}

impl AppConfig {
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup. `from_env` is this over
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let dev_auth_bypass = parse_or(get("DEV_AUTH_BYPASS"), "DEV_AUTH_BYPASS", false)?;
        let jwt_secret = get("JWT_SECRET");
        if jwt_secret.is_none() && !dev_auth_bypass {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            extraction_service_url: required("EXTRACTION_SERVICE_URL")?,
            extraction_api_key: get("EXTRACTION_API_KEY"),
            extraction_endpoint: get("EXTRACTION_ENDPOINT").unwrap_or_else(|| "v2".to_string()),
            extraction_max_attempts: parse_or(
                get("EXTRACTION_MAX_ATTEMPTS"),
                "EXTRACTION_MAX_ATTEMPTS",
                3,
            )?,
            extraction_retry_base_ms: parse_or(
                get("EXTRACTION_RETRY_BASE_MS"),
                "EXTRACTION_RETRY_BASE_MS",
                200,
            )?,
            http_timeout_secs: parse_or(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 30)?,
            jwt_secret,
            dev_auth_bypass,
            api_host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            api_port: parse_or(get("API_PORT"), "API_PORT", 3000)?,
            import_rate_limit_per_hour: parse_or(
                get("IMPORT_RATE_LIMIT_PER_HOUR"),
                "IMPORT_RATE_LIMIT_PER_HOUR",
                30,
            )?,
        })
    }

    /// Fixed configuration for tests. Never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/recipes_test".to_string(),
            extraction_service_url: "http://127.0.0.1:8000".to_string(),
            extraction_api_key: None,
            extraction_endpoint: "v2".to_string(),
            extraction_max_attempts: 3,
            extraction_retry_base_ms: 0,
            http_timeout_secs: 5,
            jwt_secret: Some("test-secret-key".to_string()),
            dev_auth_bypass: false,
            api_host: "127.0.0.1".to_string(),
            api_port: 0,
            import_rate_limit_per_hour: 1000,
        }
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  EXTRACTION_SERVICE_URL: {}", self.extraction_service_url);
        tracing::info!("  EXTRACTION_ENDPOINT: {}", self.extraction_endpoint);
        tracing::info!("  EXTRACTION_API_KEY: {}", preview_opt(&self.extraction_api_key));
        tracing::info!("  JWT_SECRET: {}", preview_opt(&self.jwt_secret));
        if self.dev_auth_bypass {
            tracing::warn!("  DEV_AUTH_BYPASS is on: bearer tokens are optional");
        }
    }
}

/// First few characters of a secret plus its length.
fn preview(val: &str) -> String {
    let head: String = val.chars().take(5).collect();
    format!("{head}...({} chars)", val.chars().count())
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> ConfigResult<T> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
