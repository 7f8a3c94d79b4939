use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, StaffUser};
use crate::error::{AppError, AppResult};
use crate::models::{Announcement, NewAnnouncement, SUBJECT_MAX_CHARS};
use crate::requests::clamp_limit;
use crate::schema::announcements;
use crate::state::AppState;
use crate::utils::{check_max_chars, to_iso};

#[derive(Serialize)]
pub struct AnnouncementResponse {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub posted_by: Uuid,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Announcement> for AnnouncementResponse {
    fn from(announcement: Announcement) -> Self {
        Self {
            id: announcement.id,
            title: announcement.title,
            body: announcement.body,
            posted_by: announcement.posted_by,
            created_at: to_iso(announcement.created_at),
            updated_at: to_iso(announcement.updated_at),
        }
    }
}

#[derive(Deserialize)]
pub struct AnnouncementListQuery {
    pub limit: Option<i64>,
}

pub async fn list_announcements(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<AnnouncementListQuery>,
) -> AppResult<Json<Vec<AnnouncementResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<Announcement> = announcements::table
        .order(announcements::created_at.desc())
        .limit(clamp_limit(params.limit))
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(AnnouncementResponse::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
}

pub async fn create_announcement(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> AppResult<(StatusCode, Json<AnnouncementResponse>)> {
    let title = payload.title.trim();
    let body = payload.body.trim();
    if title.is_empty() || body.is_empty() {
        return Err(AppError::bad_request("title and body are required"));
    }
    check_max_chars("title", title, SUBJECT_MAX_CHARS).map_err(AppError::bad_request)?;

    let mut conn = state.db()?;
    let created: Announcement = diesel::insert_into(announcements::table)
        .values(&NewAnnouncement {
            id: Uuid::new_v4(),
            title: title.to_string(),
            body: body.to_string(),
            posted_by: staff.user_id,
        })
        .get_result(&mut conn)?;

    info!(announcement_id = %created.id, posted_by = %staff.user_id, "announcement posted");
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[derive(Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = announcements)]
struct AnnouncementChangeset<'a> {
    title: Option<&'a str>,
    body: Option<&'a str>,
    updated_at: NaiveDateTime,
}

pub async fn update_announcement(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(announcement_id): Path<Uuid>,
    Json(payload): Json<UpdateAnnouncementRequest>,
) -> AppResult<Json<AnnouncementResponse>> {
    let title = payload.title.as_deref().map(str::trim);
    let body = payload.body.as_deref().map(str::trim);
    if title.is_some_and(str::is_empty) || body.is_some_and(str::is_empty) {
        return Err(AppError::bad_request("title and body must not be empty"));
    }
    if let Some(title) = title {
        check_max_chars("title", title, SUBJECT_MAX_CHARS).map_err(AppError::bad_request)?;
    }

    let mut conn = state.db()?;
    let updated: Announcement = diesel::update(announcements::table.find(announcement_id))
        .set(&AnnouncementChangeset {
            title,
            body,
            updated_at: Utc::now().naive_utc(),
        })
        .get_result(&mut conn)?;

    Ok(Json(updated.into()))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(announcement_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let deleted =
        diesel::delete(announcements::table.find(announcement_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(announcement_id = %announcement_id, deleted_by = %staff.user_id, "announcement deleted");
    Ok(StatusCode::NO_CONTENT)
}
