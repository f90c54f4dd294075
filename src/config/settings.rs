use serde::Deserialize;

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    /// Lead time before nominal expiry after which a cached token is unusable.
    pub safety_buffer_seconds: Option<u64>,
    /// Hard staleness ceiling independent of the provider-declared expiry.
    pub max_token_age_seconds: Option<u64>,
    /// Lifetime assumed when neither broker metadata nor token claims carry one.
    pub assumed_lifetime_seconds: Option<u64>,
    /// Upper bound for one broker/direct exchange.
    pub exchange_timeout_seconds: Option<u64>,
    /// Allowance for clock skew when checking expiry.
    pub clock_tolerance_seconds: Option<i64>,
    /// Trusted broker endpoint tried before direct exchange.
    pub broker_url: Option<String>,
    /// Expected `iss` claim. Unset skips the check.
    pub issuer: Option<String>,
    /// Expected `aud` claim. Unset skips the check.
    pub audience: Option<String>,
    pub renewal: Option<RenewalTimingConfig>,
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenewalTimingConfig {
    /// Recurring health-check tick.
    pub check_interval_seconds: Option<u64>,
    /// Renewal fires this long before expiry.
    pub renewal_buffer_seconds: Option<u64>,
    /// Fixed delay before retrying a failed renewal.
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "json".to_string())
            .to_lowercase()
            .as_str()
        {
            "compact" | "text" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// ================================
/// Credential bootstrap block
/// ================================
///
/// Lets a deployment seed the credential store from config instead of an
/// interactive save. The secret still goes through the store's encryption
/// path before it is held anywhere.
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub region: String,
}
