use std::sync::Arc;

use anyhow::{Context, Result};

use super::{
    config::Config,
    database::RedisStore,
    registry::Registry,
    store::KeyValueStore,
    upstream::{FormApi, JotformClient},
};

pub struct AppState {
    pub config: Config,
    pub registry: Registry,
    pub api: Arc<dyn FormApi>,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>> {
        let config = Config::load()?;

        let store = RedisStore::connect(&config.redis_url)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
        let api = JotformClient::new(&config.api_url, config.upstream_timeout)
            .context("Failed to build upstream client")?;

        Ok(Self::with_parts(config, Arc::new(store), Arc::new(api)))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn FormApi>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: Registry::new(store),
            api,
        })
    }
}
