use axum::{extract::State, Json};
use tracing::info;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::barangay::{load_settings, save_settings, BarangaySettings};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub async fn get_settings(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<BarangaySettings>> {
    let mut conn = state.db()?;
    Ok(Json(load_settings(&mut conn)?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<BarangaySettings>,
) -> AppResult<Json<BarangaySettings>> {
    payload.validate().map_err(AppError::bad_request)?;

    let mut conn = state.db()?;
    save_settings(&mut conn, &payload)?;

    info!(admin_id = %admin.user_id, barangay = %payload.barangay_name, "settings saved");
    Ok(Json(payload))
}
