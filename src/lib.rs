pub mod api;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fit;
pub mod hints;
pub mod json;
pub mod links;
pub mod llm;
pub mod pages;
pub mod research;
pub mod scraper;
pub mod screening;
pub mod search;

use std::sync::Arc;
use tracing::info;

use crate::cache::{HtmlCache, JsonCache};
use crate::config::Config;
use crate::error::Result;
use crate::llm::{LanguageModel, OpenRouterClient};
use crate::scraper::{HttpFetcher, PageFetcher, browser_client};
use crate::search::{DuckDuckGo, SearchBackend};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub search: Arc<dyn SearchBackend>,
    pub llm: Arc<dyn LanguageModel>,
    pub profile_cache: JsonCache,
    pub fit_cache: JsonCache,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(
            browser_client(config.http_timeout)?,
            Some(HtmlCache::new(&config.http_cache_dir)),
        );
        let search = DuckDuckGo::new(config.http_timeout)?;
        let llm = OpenRouterClient::new(config.openrouter_api_key.clone(), config.llm_model.clone());

        Ok(Self {
            profile_cache: JsonCache::new(config.profile_cache_dir()),
            fit_cache: JsonCache::new(config.fit_cache_dir()),
            fetcher: Arc::new(fetcher),
            search: Arc::new(search),
            llm: Arc::new(llm),
            config: Arc::new(config),
        })
    }

    /// Applies the configured maximum cache age, if any.
    pub fn prune_caches(&self) -> Result<usize> {
        let Some(max_age) = self.config.cache_max_age else {
            return Ok(0);
        };
        let removed = self.profile_cache.prune_older_than(max_age)?
            + self.fit_cache.prune_older_than(max_age)?
            + HtmlCache::new(&self.config.http_cache_dir).prune_older_than(max_age)?;
        info!(removed, "pruned cache entries");
        Ok(removed)
    }
}
