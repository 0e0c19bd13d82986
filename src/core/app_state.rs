use std::sync::Arc;

use anyhow::Result;

use crate::core::aliases::DbPool;
use crate::core::config::AppConfig;
use crate::core::db;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub http_client: reqwest::Client,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> Result<Self> {
        let db_pool = db::create_pool(&config.database.url).await?;
        Ok(Self {
            db_pool,
            http_client: reqwest::Client::new(),
            config: Arc::new(config),
        })
    }
}
