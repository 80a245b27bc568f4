use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,

    // Listing settings
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub thread_max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(3000),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000,http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            default_page_size: lookup("DEFAULT_PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(25),
            max_page_size: lookup("MAX_PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            thread_max_depth: lookup("THREAD_MAX_DEPTH")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }

    /// Resolves a caller-supplied page size against the configured bounds.
    pub fn page_limit(&self, requested: Option<u32>, default: u32) -> usize {
        requested.unwrap_or(default).min(self.max_page_size) as usize
    }
}
