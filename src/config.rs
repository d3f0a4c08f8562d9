//! Application configuration loaded from environment variables.
//!
//! The hosted store is optional: without `SUPABASE_URL` and
//! `SUPABASE_ANON_KEY` the server keeps polls in memory, which is what local
//! development and the test suite use.

use std::env;

/// Where poll and vote rows live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Hosted PostgREST store.
    Remote {
        /// Project URL, e.g. `https://xyzcompany.supabase.co`
        url: String,
        /// Public anon key (sent as `apikey` and bearer token)
        anon_key: String,
    },
    /// Process-local tables, lost on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Public base URL of this service, used for share links
    pub public_url: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Backing store selection
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            None => 8080,
        };

        let public_url = lookup("PUBLIC_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".to_string());

        let store = match (lookup("SUPABASE_URL"), lookup("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => StoreConfig::Remote {
                url: url.trim().to_string(),
                anon_key: anon_key.trim().to_string(),
            },
            (None, None) => StoreConfig::Memory,
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_ANON_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("SUPABASE_URL")),
        };

        Ok(Self {
            port,
            public_url,
            frontend_url,
            store,
        })
    }

    /// In-memory configuration for tests.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            public_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            store: StoreConfig::Memory,
        }
    }

    /// Voter cookies are only marked `Secure` when served over https.
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
