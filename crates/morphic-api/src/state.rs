//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both the CLI and
//! the HTTP API. Core services are generic over repository traits; AppState
//! pins them to the SQLite implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use morphic_core::analytics::AnalyticsSink;
use morphic_core::cache::{CacheConfig, MemoryCache};
use morphic_core::chat::feedback::FeedbackService;
use morphic_core::chat::service::ChatService;
use morphic_core::chat::stream::ResearchDeps;
use morphic_core::llm::registry::ProviderRegistry;
use morphic_core::rate_limit::{CounterStore, DailyRateLimiter};
use morphic_infra::analytics::analytics_sink;
use morphic_infra::config::{ProviderCredentials, load_app_config, load_models_config};
use morphic_infra::fetch::WebFetcher;
use morphic_infra::llm::build_provider_registry;
use morphic_infra::redis::{DEFAULT_REDIS_URL, RedisCounterStore};
use morphic_infra::search::create_search_provider;
use morphic_infra::slack::SlackNotifier;
use morphic_infra::sqlite::pool::database_url_for;
use morphic_infra::sqlite::{DatabasePool, SqliteChatRepository, SqliteFeedbackRepository};
use morphic_types::chat::ChatWithMessages;
use morphic_types::config::AppConfig;
use morphic_types::model::ModelsConfig;

pub type ConcreteChatService = ChatService<SqliteChatRepository>;
pub type ConcreteFeedbackService = FeedbackService<SqliteFeedbackRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub models: Arc<ModelsConfig>,
    pub chat_service: Arc<ConcreteChatService>,
    pub feedback_service: Arc<ConcreteFeedbackService>,
    pub research: ResearchDeps,
    pub rate_limiter: Arc<DailyRateLimiter>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub cache: Arc<MemoryCache<ChatWithMessages>>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Load configuration from `data_dir` and the environment, open the
    /// database and connect every external service.
    pub async fn init(data_dir: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;

        let config = load_app_config(data_dir).await;
        let models = load_models_config(data_dir).await;
        let credentials = ProviderCredentials::from_env();

        let db_pool = DatabasePool::new(&format!("{}?mode=rwc", database_url_for(data_dir))).await?;
        let counter_store = connect_counter_store(&config, &credentials).await;

        Ok(Self::assemble(
            config,
            models,
            &credentials,
            db_pool,
            counter_store,
            build_provider_registry(&credentials),
            data_dir.to_path_buf(),
        ))
    }

    /// Wire services from already-built parts.
    pub fn assemble(
        config: AppConfig,
        models: ModelsConfig,
        credentials: &ProviderCredentials,
        db_pool: DatabasePool,
        counter_store: Option<Arc<dyn CounterStore>>,
        providers: ProviderRegistry,
        data_dir: PathBuf,
    ) -> Self {
        let cache = Arc::new(MemoryCache::new(CacheConfig::from(&config.cache)));

        let chat_service = ChatService::new(SqliteChatRepository::new(db_pool.clone()), cache.clone());

        let mut feedback_service = FeedbackService::new(SqliteFeedbackRepository::new(db_pool.clone()));
        if let Some(url) = &credentials.slack_webhook_url {
            feedback_service = feedback_service.with_notifier(Arc::new(SlackNotifier::new(url.clone())));
        }

        let rate_limiter = match counter_store {
            Some(store) if config.features.cloud_deployment => {
                DailyRateLimiter::new(store, config.rate_limit.clone())
            }
            _ => DailyRateLimiter::disabled(config.rate_limit.clone()),
        };

        let research = ResearchDeps {
            providers: Arc::new(providers),
            search: create_search_provider(&config.search, credentials),
            fetcher: Arc::new(WebFetcher::new(credentials)),
            related_model: models.related_questions.clone(),
        };

        Self {
            analytics: analytics_sink(config.features.cloud_deployment),
            config: Arc::new(config),
            models: Arc::new(models),
            chat_service: Arc::new(chat_service),
            feedback_service: Arc::new(feedback_service),
            research,
            rate_limiter: Arc::new(rate_limiter),
            cache,
            data_dir,
            db_pool,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.research.providers
    }
}

/// Redis counters for cloud deployments.
///
/// Connection failures disable rate limiting rather than startup.
async fn connect_counter_store(
    config: &AppConfig,
    credentials: &ProviderCredentials,
) -> Option<Arc<dyn CounterStore>> {
    if !config.features.cloud_deployment || !config.redis.enabled {
        return None;
    }

    let url = config.redis.url.as_deref().unwrap_or(DEFAULT_REDIS_URL);
    match RedisCounterStore::connect(url, config.redis.username.as_deref(), credentials.redis_password.as_ref()).await
    {
        Ok(store) => {
            tracing::info!("rate limiting backed by redis");
            Some(Arc::new(store))
        }
        Err(e) => {
            tracing::warn!(error = %e, "redis unavailable, rate limiting disabled");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use morphic_core::rate_limit::InMemoryCounterStore;

    /// State over a fresh temp database with no LLM providers configured.
    pub async fn test_state(config: AppConfig) -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let db_pool = DatabasePool::new(&url).await.unwrap();
        let data_dir = dir.path().to_path_buf();
        // Leak the tempdir so it outlives the pool.
        std::mem::forget(dir);

        AppState::assemble(
            config,
            ModelsConfig::default(),
            &ProviderCredentials::default(),
            db_pool,
            Some(Arc::new(InMemoryCounterStore::new())),
            ProviderRegistry::new(),
            data_dir,
        )
    }
}
