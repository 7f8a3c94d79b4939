use axum::{extract::State, Json};
use chrono::Utc;
use tracing::{error, info};

use crate::auth::AdminUser;
use crate::backup::{run_backup, BackupSummary};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub async fn create_backup(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<BackupSummary>> {
    info!(admin_id = %admin.user_id, "backup requested");

    let summary = run_backup(
        &state.pool,
        state.storage.as_ref(),
        &state.config.backup_prefix,
        Utc::now(),
    )
    .await
    .map_err(|err| {
        error!(admin_id = %admin.user_id, error = ?err, "backup failed");
        AppError::internal("backup failed")
    })?;

    info!(
        prefix = %summary.prefix,
        tables = summary.objects.len(),
        "backup complete"
    );
    Ok(Json(summary))
}
