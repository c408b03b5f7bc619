use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::gemini;

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub google: GoogleOAuthConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HS256 signing key for session tokens. Must be set before serving.
    #[serde(default)]
    pub jwt_secret: String,
    /// How long issued tokens stay valid.
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_days: default_token_ttl_days(),
        }
    }
}

/// Google OAuth settings for the token-issuance flow.
///
/// The endpoint fields default to the real Google endpoints and exist so
/// tests can point the exchange at a mock server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleOAuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    #[serde(default = "default_google_auth_endpoint")]
    pub auth_endpoint: String,
    #[serde(default = "default_google_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default = "default_google_userinfo_endpoint")]
    pub userinfo_endpoint: String,
}

impl Default for GoogleOAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: default_redirect_url(),
            auth_endpoint: default_google_auth_endpoint(),
            token_endpoint: default_google_token_endpoint(),
            userinfo_endpoint: default_google_userinfo_endpoint(),
        }
    }
}

impl GoogleOAuthConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_gemini_endpoint(),
            timeout_secs: default_gemini_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Maximum billable calls per identity per rolling 24-hour window.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// When true, prompts containing a directory-navigation phrase resolve to
    /// CHANGEDIRECTORY locally, skipping the remote classification call.
    /// When false, classification always defers to the completion service.
    #[serde(default = "default_true")]
    pub cd_heuristic: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cd_heuristic: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_port() -> u16 {
    7990
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("termwise.db")
}
const fn default_token_ttl_days() -> i64 {
    30
}
fn default_redirect_url() -> String {
    "http://localhost:7999/callback".to_string()
}
fn default_google_auth_endpoint() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}
fn default_google_token_endpoint() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}
fn default_google_userinfo_endpoint() -> String {
    "https://www.googleapis.com/oauth2/v2/userinfo".to_string()
}
fn default_gemini_endpoint() -> String {
    gemini::DEFAULT_ENDPOINT.to_string()
}
const fn default_gemini_timeout_secs() -> u64 {
    60
}
const fn default_daily_limit() -> i64 {
    50
}
const fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading and env overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. Any setting prefixed with `TERMWISE_` takes precedence over
    /// the file value.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        macro_rules! env_str {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                }
            };
        }
        macro_rules! env_bool {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                }
            };
        }
        macro_rules! env_parse {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = parsed;
                    }
                }
            };
        }

        // -- Server --
        env_str!("TERMWISE_SERVER_HOST", self.server.host);
        env_parse!("TERMWISE_SERVER_PORT", self.server.port);

        // -- Database --
        if let Ok(val) = std::env::var("TERMWISE_DATABASE_PATH") {
            self.database.path = PathBuf::from(val);
        }

        // -- Auth --
        env_str!("TERMWISE_JWT_SECRET", self.auth.jwt_secret);
        env_parse!("TERMWISE_TOKEN_TTL_DAYS", self.auth.token_ttl_days);

        // -- Google OAuth --
        env_str!("TERMWISE_GOOGLE_CLIENT_ID", self.google.client_id);
        env_str!("TERMWISE_GOOGLE_CLIENT_SECRET", self.google.client_secret);
        env_str!("TERMWISE_GOOGLE_REDIRECT_URL", self.google.redirect_url);

        // -- Gemini --
        env_str!("TERMWISE_GEMINI_API_KEY", self.gemini.api_key);
        env_str!("TERMWISE_GEMINI_ENDPOINT", self.gemini.endpoint);
        env_parse!("TERMWISE_GEMINI_TIMEOUT_SECS", self.gemini.timeout_secs);

        // -- Quota --
        env_parse!("TERMWISE_QUOTA_DAILY_LIMIT", self.quota.daily_limit);

        // -- Classifier --
        env_bool!("TERMWISE_CD_HEURISTIC", self.classifier.cd_heuristic);

        // -- Logging --
        env_str!("TERMWISE_LOG_LEVEL", self.logging.level);
        env_bool!("TERMWISE_LOG_JSON", self.logging.json);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
