use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::inbox::{
    deliver, list_inbox, list_sent, mark_all_read, mark_read, unread_count, Delivery, Reader,
    KIND_MESSAGE, KIND_NOTIFICATION,
};
use crate::models::{InboxItem, SUBJECT_MAX_CHARS};
use crate::requests::clamp_limit;
use crate::schema::users;
use crate::state::AppState;
use crate::utils::{check_max_chars, to_iso};

#[derive(Serialize)]
pub struct InboxItemResponse {
    pub id: Uuid,
    pub kind: String,
    pub sender_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub subject: String,
    pub body: String,
    pub link: Option<String>,
    pub read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

impl From<InboxItem> for InboxItemResponse {
    fn from(item: InboxItem) -> Self {
        Self {
            id: item.id,
            kind: item.kind,
            sender_id: item.sender_id,
            recipient_id: item.recipient_id,
            subject: item.subject,
            body: item.body,
            link: item.link,
            read: item.read,
            read_at: item.read_at.map(to_iso),
            created_at: to_iso(item.created_at),
        }
    }
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

fn reader(user: &AuthenticatedUser) -> Reader {
    Reader {
        user_id: user.user_id,
        office: user.is_staff(),
    }
}

#[derive(Deserialize)]
pub struct InboxQuery {
    #[serde(rename = "box")]
    pub mailbox: Option<String>,
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i64>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<InboxQuery>,
) -> AppResult<Json<Vec<InboxItemResponse>>> {
    let limit = clamp_limit(params.limit);
    let mut conn = state.db()?;
    let items = match params.mailbox.as_deref().unwrap_or("inbox") {
        "inbox" => list_inbox(&mut conn, KIND_MESSAGE, reader(&user), params.unread, limit)?,
        "sent" => list_sent(&mut conn, user.user_id, limit)?,
        other => {
            return Err(AppError::bad_request(format!(
                "box must be inbox or sent, got {other}"
            )))
        }
    };

    Ok(Json(items.into_iter().map(InboxItemResponse::from).collect()))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Option<Uuid>,
    pub subject: String,
    pub body: String,
}

/// Residents write to the barangay office; staff answer a specific user.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<InboxItemResponse>)> {
    let subject = payload.subject.trim();
    let body = payload.body.trim();
    if subject.is_empty() || body.is_empty() {
        return Err(AppError::bad_request("subject and body are required"));
    }
    check_max_chars("subject", subject, SUBJECT_MAX_CHARS).map_err(AppError::bad_request)?;

    let mut conn = state.db()?;
    let recipient_id = match (user.is_staff(), payload.recipient_id) {
        (false, Some(_)) => {
            return Err(AppError::bad_request(
                "residents can only message the barangay office",
            ))
        }
        (false, None) => None,
        (true, None) => return Err(AppError::bad_request("recipient_id is required")),
        (true, Some(recipient_id)) => {
            let exists: bool = diesel::select(diesel::dsl::exists(users::table.find(recipient_id)))
                .get_result(&mut conn)?;
            if !exists {
                return Err(AppError::bad_request("recipient does not exist"));
            }
            Some(recipient_id)
        }
    };

    let item = deliver(
        &mut conn,
        Delivery::message(Some(user.user_id), recipient_id, subject, body),
    )?;

    info!(
        message_id = %item.id,
        sender_id = %user.user_id,
        office = recipient_id.is_none(),
        "message sent"
    );
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn unread_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let mut conn = state.db()?;
    let count = unread_count(&mut conn, KIND_MESSAGE, reader(&user))?;
    Ok(Json(UnreadCountResponse { count }))
}

pub async fn read_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    mark_one(&state, &user, KIND_MESSAGE, item_id)
}

#[derive(Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i64>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<Vec<InboxItemResponse>>> {
    let mut conn = state.db()?;
    let items = list_inbox(
        &mut conn,
        KIND_NOTIFICATION,
        reader(&user),
        params.unread,
        clamp_limit(params.limit),
    )?;
    Ok(Json(items.into_iter().map(InboxItemResponse::from).collect()))
}

pub async fn unread_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let mut conn = state.db()?;
    let count = unread_count(&mut conn, KIND_NOTIFICATION, reader(&user))?;
    Ok(Json(UnreadCountResponse { count }))
}

pub async fn read_notification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    mark_one(&state, &user, KIND_NOTIFICATION, item_id)
}

pub async fn read_all_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<MarkAllReadResponse>> {
    let mut conn = state.db()?;
    let updated = mark_all_read(&mut conn, KIND_NOTIFICATION, reader(&user))?;
    Ok(Json(MarkAllReadResponse { updated }))
}

fn mark_one(
    state: &AppState,
    user: &AuthenticatedUser,
    kind: &'static str,
    item_id: Uuid,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    if mark_read(&mut conn, kind, reader(user), item_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found())
    }
}
