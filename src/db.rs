use std::sync::Arc;

use crate::auth::AuthService;
use crate::cache::{Cache, MemoryCache, RedisCache};
use crate::config::AppConfig;
use crate::sentiment::{LexiconModel, SentimentAnalyzer};
use crate::services::{BookService, ReviewService};
use crate::store::{MemoryStore, MongoStore, Store};

pub struct AppState {
    pub books: BookService,
    pub reviews: ReviewService,
    pub auth: AuthService,
}

/// Wires engines into services. Without MONGO_URI or CACHE_URL the in-memory
/// implementations are used, so a bare `cargo run` works locally.
pub async fn init_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn Store> = match &cfg.mongo_uri {
        Some(uri) => {
            let store = MongoStore::connect(uri, &cfg.db_name).await?;
            tracing::info!(db = %cfg.db_name, "connected to mongodb");
            Arc::new(store)
        }
        None => {
            tracing::warn!("MONGO_URI not set; falling back to in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let cache: Arc<dyn Cache> = match &cfg.cache_url {
        Some(url) => match RedisCache::new(url).await {
            Ok(c) => {
                tracing::info!("connected to redis cache");
                Arc::new(c)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable; falling back to in-memory cache");
                Arc::new(MemoryCache::new())
            }
        },
        None => Arc::new(MemoryCache::new()),
    };

    // Model weights load once at startup; the analyzer is shared read-only.
    let analyzer = Arc::new(SentimentAnalyzer::new(
        Arc::new(LexiconModel::new()),
        cfg.sentiment_timeout,
    ));

    Ok(AppState {
        books: BookService::new(Arc::clone(&store), cache, cfg.cache_ttl),
        reviews: ReviewService::new(Arc::clone(&store), analyzer),
        auth: AuthService::new(store, cfg.jwt_secret.clone(), cfg.token_ttl),
    })
}
