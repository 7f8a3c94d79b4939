use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::barangay::{load_officials, normalize_position, position_label};
use crate::error::{AppError, AppResult};
use crate::models::{NewOfficial, Official, NAME_MAX_CHARS};
use crate::schema::officials;
use crate::state::AppState;
use crate::utils::check_max_chars;

#[derive(Serialize)]
pub struct OfficialResponse {
    pub id: Uuid,
    pub name: String,
    pub position: String,
    pub position_label: String,
    pub display_order: i32,
}

impl From<Official> for OfficialResponse {
    fn from(official: Official) -> Self {
        Self {
            position_label: position_label(&official.position).to_string(),
            id: official.id,
            name: official.name,
            position: official.position,
            display_order: official.display_order,
        }
    }
}

pub async fn list_officials(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Vec<OfficialResponse>>> {
    let mut conn = state.db()?;
    let rows = load_officials(&mut conn)?;
    Ok(Json(rows.into_iter().map(OfficialResponse::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateOfficialRequest {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub display_order: i32,
}

fn parse_position(value: &str) -> AppResult<&'static str> {
    normalize_position(value)
        .ok_or_else(|| AppError::bad_request(format!("unknown position {value:?}")))
}

/// Exclusive positions are guarded by a partial unique index; a clash surfaces as 409.
fn map_position_conflict(err: DieselError, position: Option<&str>) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            let label = position.map(position_label).unwrap_or("position");
            AppError::conflict(format!("{label} is already assigned"))
        }
        other => AppError::from(other),
    }
}

pub async fn create_official(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateOfficialRequest>,
) -> AppResult<(StatusCode, Json<OfficialResponse>)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    check_max_chars("name", name, NAME_MAX_CHARS).map_err(AppError::bad_request)?;
    let position = parse_position(&payload.position)?;

    let mut conn = state.db()?;
    let created: Official = diesel::insert_into(officials::table)
        .values(&NewOfficial {
            id: Uuid::new_v4(),
            name: name.to_string(),
            position: position.to_string(),
            display_order: payload.display_order,
        })
        .get_result(&mut conn)
        .map_err(|err| map_position_conflict(err, Some(position)))?;

    info!(official_id = %created.id, position, admin_id = %admin.user_id, "official added");
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[derive(Deserialize)]
pub struct UpdateOfficialRequest {
    pub name: Option<String>,
    pub position: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(AsChangeset)]
#[diesel(table_name = officials)]
struct OfficialChangeset<'a> {
    name: Option<&'a str>,
    position: Option<&'a str>,
    display_order: Option<i32>,
    updated_at: NaiveDateTime,
}

pub async fn update_official(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(official_id): Path<Uuid>,
    Json(payload): Json<UpdateOfficialRequest>,
) -> AppResult<Json<OfficialResponse>> {
    let name = payload.name.as_deref().map(str::trim);
    if name.is_some_and(str::is_empty) {
        return Err(AppError::bad_request("name must not be empty"));
    }
    if let Some(name) = name {
        check_max_chars("name", name, NAME_MAX_CHARS).map_err(AppError::bad_request)?;
    }
    let position = payload.position.as_deref().map(parse_position).transpose()?;

    let mut conn = state.db()?;
    let updated: Official = diesel::update(officials::table.find(official_id))
        .set(&OfficialChangeset {
            name,
            position,
            display_order: payload.display_order,
            updated_at: Utc::now().naive_utc(),
        })
        .get_result(&mut conn)
        .map_err(|err| map_position_conflict(err, position))?;

    Ok(Json(updated.into()))
}

pub async fn delete_official(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(official_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(officials::table.find(official_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
