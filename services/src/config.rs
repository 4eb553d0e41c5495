use foodgram_utils::version_info::RuntimeEnv;
use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use tracing::info;

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "prod")]
    Prod,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "pr")]
    Pr,
    #[serde(rename = "nightly")]
    Nightly,
}

impl From<&Env> for RuntimeEnv {
    fn from(env: &Env) -> Self {
        match env {
            Env::Local => Self::Local,
            Env::Prod => Self::Prod,
            Env::Test => Self::Test,
            Env::Pr => Self::Pr,
            Env::Nightly => Self::Nightly,
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Prod => write!(f, "prod"),
            Self::Test => write!(f, "test"),
            Self::Pr => write!(f, "pr"),
            Self::Nightly => write!(f, "nightly"),
        }
    }
}

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    database_url: String,
    server_addr: String,
    port: u16,
    // JWT secret for session tokens
    jwt_secret: String,
    session_ttl_seconds: i64,
    // Local directory holding uploaded recipe images
    media_root: String,
    // Public URL prefix for media, always starts and ends with '/'
    media_url: String,
    page_size: u32,
}

// Intermediate struct for deserializing environment variables
// where most fields are optional.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    database_url: String,
    server_addr: Option<String>,
    port: Option<u16>,
    jwt_secret: Option<String>,
    session_ttl_seconds: Option<i64>,
    media_root: Option<String>,
    media_url: Option<String>,
    page_size: Option<u32>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// Available to both unit and integration tests; not for production use.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            database_url: "postgres://localhost:5432/foodgram_test".to_owned(),
            server_addr: "127.0.0.1".to_owned(),
            port: 8080,
            jwt_secret: "test-jwt-secret-key-for-local-development".to_owned(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            media_root: "./media".to_owned(),
            media_url: "/media/".to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[cfg(test)]
    pub fn new_for_test_with_env(env: Env) -> Self {
        Self {
            env,
            ..Self::new_for_test()
        }
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self.env, Env::Prod)
    }

    /// Get the JWT secret for signing session tokens.
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Lifetime of issued session tokens, in seconds.
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub fn media_root(&self) -> &str {
        &self.media_root
    }

    pub fn media_url(&self) -> &str {
        &self.media_url
    }

    /// Public URL of a stored media file, e.g. `/media/recipes/images/x.png`.
    pub fn media_url_for(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path.trim_start_matches('/'))
    }

    /// Default page size for paginated lists.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            database_url,
            server_addr,
            port,
            jwt_secret,
            session_ttl_seconds,
            media_root,
            media_url,
            page_size,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {}", addr);
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    _ => "0.0.0.0",
                };
                info!(
                    "SERVER_ADDR not set, defaulting to {} for {} environment",
                    default_addr, env
                );
                default_addr.to_owned()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => {
                info!("PORT not set, defaulting to 8080 for local environment");
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        // JWT secret is required for deployed environments, optional for local/test
        let jwt_secret = match jwt_secret {
            Some(secret) if secret.is_empty() => anyhow::bail!("JWT_SECRET must not be empty"),
            Some(secret) => secret,
            None if matches!(env, Env::Local | Env::Test) => {
                info!("JWT_SECRET not set, using default for {} environment", env);
                "default-jwt-secret-for-local-development-only".to_owned()
            }
            None => anyhow::bail!("JWT_SECRET must be set for {} environment", env),
        };

        let session_ttl_seconds = session_ttl_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECONDS);
        if session_ttl_seconds <= 0 {
            anyhow::bail!("SESSION_TTL_SECONDS must be positive, got {session_ttl_seconds}");
        }

        let media_root = media_root.unwrap_or_else(|| "./media".to_owned());
        let media_url = media_url.unwrap_or_else(|| "/media/".to_owned());
        if !media_url.starts_with('/') || !media_url.ends_with('/') {
            anyhow::bail!("MEDIA_URL must start and end with '/', got {media_url}");
        }

        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            anyhow::bail!("PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}, got {page_size}");
        }

        Ok(Self {
            env,
            database_url,
            server_addr,
            port,
            jwt_secret,
            session_ttl_seconds,
            media_root,
            media_url,
            page_size,
        })
    }
}
