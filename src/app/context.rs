use std::sync::Arc;

use tracing::info;

use crate::app::error::Result;
use crate::config::Config;
use crate::daemon::DaemonConfig;
use crate::engine::{Engine, EngineSettings};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::handlers::{AccessPolicy, CommandHandler};
use crate::notifier::{LogTransport, Transport, WebhookTransport};
use crate::store::{JsonStateStore, StateStore};

/// Wires configuration into an engine and its command handler.
pub struct AppContext {
    pub config: Config,
    pub engine: Arc<Engine>,
    pub handler: CommandHandler,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let state_path = config.state_file_path()?;
        std::fs::create_dir_all(config.data_dir()?)?;
        let store: Arc<dyn StateStore + Send + Sync> = Arc::new(JsonStateStore::new(&state_path));
        info!("State file: {}", state_path.display());

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn StateStore + Send + Sync>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(
            config.request_timeout(),
            &config.user_agent,
        )?);

        let transport: Arc<dyn Transport + Send + Sync> = match config.delivery.webhook_url {
            Some(ref url) => Arc::new(WebhookTransport::new(url.clone(), config.request_timeout())?),
            None => Arc::new(LogTransport::new()),
        };

        let settings = EngineSettings {
            banner: config.banner.clone(),
            fetch_deadline: config.request_timeout(),
            default_destinations: config.target_destinations.clone(),
        };

        let engine = Arc::new(Engine::new(
            config.feeds.clone(),
            fetcher,
            transport,
            store,
            settings,
        ));
        let handler = CommandHandler::new(engine.clone(), AccessPolicy::new(config.admin_ids.clone()));

        Ok(Self {
            config,
            engine,
            handler,
        })
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            poll_interval: self.config.poll_interval(),
            shutdown_grace: self.config.shutdown_grace(),
        }
    }
}
