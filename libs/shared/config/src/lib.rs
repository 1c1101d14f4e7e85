use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_anon_key: String,
    pub jwt_secret: String,
    pub store_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("STORE_URL not set, using empty value");
                    String::new()
                }),
            store_anon_key: env::var("STORE_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("STORE_ANON_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            store_timeout_secs: env::var("STORE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty()
            && !self.store_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}
