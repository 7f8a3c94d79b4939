use std::sync::Arc;
use std::time::Duration;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};
use tracing::error;

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
    storage::ObjectStorage,
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub const PRESIGNED_URL_EXPIRY_SECONDS: u64 = 300;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        jwt: JwtService,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            storage,
            jwt,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| {
                error!(error = %err, "database pool error");
                AppError::internal("database unavailable")
            })
    }

    /// Short-lived download URL for a private object (proofs of payment, ID photos).
    pub async fn presign(&self, key: &str) -> AppResult<String> {
        self.storage
            .presign_get_object(key, Duration::from_secs(PRESIGNED_URL_EXPIRY_SECONDS))
            .await
            .map_err(|err| {
                error!(key = %key, error = %err, "failed to presign download URL");
                AppError::internal("failed to generate download URL")
            })
    }
}
