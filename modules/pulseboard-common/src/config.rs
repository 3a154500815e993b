use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Social platform
    pub apify_api_key: String,
    pub tracked_account: String,

    // Categorizer (empty disables it)
    pub openrouter_api_key: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
    pub static_dir: String,

    // Polling
    pub poll_interval_ms: u64,
    pub refresh_post_count: u32,
    pub reply_page_size: u32,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            apify_api_key: required_env("APIFY_API_KEY"),
            tracked_account: required_env("TRACKED_ACCOUNT"),
            openrouter_api_key: env::var("OPENROUTER_API_KEY").unwrap_or_default(),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()),
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "60000".to_string())
                .parse()
                .expect("POLL_INTERVAL_MS must be a number"),
            refresh_post_count: env::var("REFRESH_POST_COUNT")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .expect("REFRESH_POST_COUNT must be a number"),
            reply_page_size: env::var("REPLY_PAGE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .expect("REPLY_PAGE_SIZE must be a number"),
        }
    }

    /// Log the non-secret parts of the configuration at startup.
    pub fn log_redacted(&self) {
        info!(
            tracked_account = %self.tracked_account,
            web_host = %self.web_host,
            web_port = self.web_port,
            poll_interval_ms = self.poll_interval_ms,
            refresh_post_count = self.refresh_post_count,
            reply_page_size = self.reply_page_size,
            categorizer_enabled = !self.openrouter_api_key.is_empty(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
