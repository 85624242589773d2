use std::env;
use std::time::Duration;

pub struct AppConfig {
    pub mongo_uri: Option<String>,
    pub db_name: String,
    pub cache_url: Option<String>,
    pub cache_ttl: Duration,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub sentiment_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore if no .env present

        let get = |k: &str, d: &str| env::var(k).unwrap_or_else(|_| d.to_string());
        let secs = |k: &str, d: u64| {
            env::var(k)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d)
        };

        Self {
            mongo_uri: env::var("MONGO_URI").ok(),
            db_name: get("DB_NAME", "bookrate_dev"),
            cache_url: env::var("CACHE_URL").ok(),
            cache_ttl: Duration::from_secs(secs("CACHE_TTL_SECS", 300)),
            jwt_secret: get("JWT_SECRET", "dev-secret-change-me"),
            token_ttl: Duration::from_secs(secs("TOKEN_TTL_SECS", 60 * 60 * 24)),
            sentiment_timeout: Duration::from_millis(secs("SENTIMENT_TIMEOUT_MS", 2000)),
        }
    }
}
