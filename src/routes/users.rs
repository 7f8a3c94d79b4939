use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{
    normalize_role, AdminUser, AuthenticatedUser, StaffUser, VERIFICATION_REJECTED,
    VERIFICATION_STATUSES, VERIFICATION_SUBMITTED, VERIFICATION_VERIFIED,
};
use crate::error::{AppError, AppResult};
use crate::inbox::{deliver, Delivery};
use crate::models::{User, CONTACT_NUMBER_MAX_CHARS, NAME_MAX_CHARS, SITIO_MAX_CHARS};
use crate::requests::{clamp_limit, like_pattern};
use crate::schema::users;
use crate::state::AppState;
use crate::storage::{is_image, resolve_content_type, verification_key};
use crate::utils::json::{classify_nullable, NullableValue};
use crate::utils::{check_max_chars, to_iso};

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub full_name: String,
    pub sitio: Option<String>,
    pub contact_number: Option<String>,
    pub verification_status: String,
    pub verified_at: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            full_name: user.full_name,
            sitio: user.sitio,
            contact_number: user.contact_number,
            verification_status: user.verification_status,
            verified_at: user.verified_at.map(to_iso),
            created_at: to_iso(user.created_at),
        }
    }
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = users)]
struct ProfileChangeset<'a> {
    full_name: Option<&'a str>,
    sitio: Option<Option<&'a str>>,
    contact_number: Option<Option<&'a str>>,
    updated_at: Option<NaiveDateTime>,
}

/// Edits the caller's own profile. `sitio` and `contact_number` may be cleared with `null`.
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<UserResponse>> {
    let full_name = match classify_nullable(body.get("full_name")).map_err(AppError::bad_request)? {
        NullableValue::Omitted => None,
        NullableValue::Null => return Err(AppError::bad_request("full_name cannot be null")),
        NullableValue::String(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                return Err(AppError::bad_request("full_name must not be empty"));
            }
            check_max_chars("full_name", &trimmed, NAME_MAX_CHARS)
                .map_err(AppError::bad_request)?;
            Some(trimmed)
        }
    };
    let sitio = nullable_text(&body, "sitio", SITIO_MAX_CHARS)?;
    let contact_number = nullable_text(&body, "contact_number", CONTACT_NUMBER_MAX_CHARS)?;

    let mut conn = state.db()?;
    let changes = ProfileChangeset {
        full_name: full_name.as_deref(),
        sitio: sitio.as_ref().map(|value| value.as_deref()),
        contact_number: contact_number.as_ref().map(|value| value.as_deref()),
        updated_at: Some(Utc::now().naive_utc()),
    };

    let updated: User = diesel::update(users::table.find(user.user_id))
        .set(&changes)
        .get_result(&mut conn)?;

    Ok(Json(updated.into()))
}

/// `None` when omitted, `Some(None)` when cleared.
fn nullable_text(body: &Value, field: &str, max: usize) -> AppResult<Option<Option<String>>> {
    Ok(
        match classify_nullable(body.get(field)).map_err(AppError::bad_request)? {
            NullableValue::Omitted => None,
            NullableValue::Null => Some(None),
            NullableValue::String(value) => {
                let trimmed = value.trim();
                check_max_chars(field, trimmed, max).map_err(AppError::bad_request)?;
                Some((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
        },
    )
}

struct UploadedImage {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

pub async fn submit_verification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<Json<UserResponse>> {
    let mut id_image: Option<UploadedImage> = None;
    let mut selfie: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        let slot = match name.as_deref() {
            Some("id_image") => &mut id_image,
            Some("selfie") => &mut selfie,
            _ => continue,
        };
        let file_name = field.file_name().unwrap_or_default().to_string();
        let declared = field.content_type().map(|mime| mime.to_string());
        let bytes = field.bytes().await.map_err(|err| {
            error!(error = %err, "failed to read verification image");
            AppError::bad_request(format!("failed to read file bytes: {err}"))
        })?;
        *slot = Some(UploadedImage {
            content_type: resolve_content_type(declared.as_deref(), &file_name),
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    let id_image = require_image(id_image, "id_image")?;
    let selfie = require_image(selfie, "selfie")?;

    let mut conn = state.db()?;
    let existing: User = users::table.find(user.user_id).first(&mut conn)?;
    if existing.verification_status == VERIFICATION_VERIFIED {
        return Err(AppError::conflict("account is already verified"));
    }

    let id_key = verification_key(user.user_id, "id", &id_image.file_name);
    let selfie_key = verification_key(user.user_id, "selfie", &selfie.file_name);

    for (key, image) in [(&id_key, id_image), (&selfie_key, selfie)] {
        state
            .storage
            .put_object(key, image.bytes, image.content_type, None)
            .await
            .map_err(|err| {
                error!(
                    user_id = %user.user_id,
                    key = %key,
                    error = %err,
                    "failed to upload verification image"
                );
                AppError::internal("failed to store verification image")
            })?;
    }

    let updated: User = match diesel::update(users::table.find(user.user_id))
        .set((
            users::id_image_key.eq(Some(id_key.as_str())),
            users::selfie_image_key.eq(Some(selfie_key.as_str())),
            users::verification_status.eq(VERIFICATION_SUBMITTED),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)
    {
        Ok(updated) => updated,
        Err(err) => {
            error!(
                user_id = %user.user_id,
                error = %err,
                "failed to record verification submission"
            );
            for key in [&id_key, &selfie_key] {
                if existing.id_image_key.as_ref() == Some(key)
                    || existing.selfie_image_key.as_ref() == Some(key)
                {
                    continue;
                }
                if let Err(cleanup) = state.storage.delete_object(key).await {
                    warn!(
                        key = %key,
                        error = %cleanup,
                        "failed to remove orphaned verification image"
                    );
                }
            }
            return Err(AppError::from(err));
        }
    };

    for stale in [existing.id_image_key, existing.selfie_image_key]
        .into_iter()
        .flatten()
        .filter(|key| *key != id_key && *key != selfie_key)
    {
        if let Err(err) = state.storage.delete_object(&stale).await {
            warn!(key = %stale, error = %err, "failed to delete replaced verification image");
        }
    }

    info!(user_id = %user.user_id, "verification submitted");
    Ok(Json(updated.into()))
}

fn require_image(image: Option<UploadedImage>, field: &str) -> AppResult<UploadedImage> {
    let image = image.ok_or_else(|| AppError::bad_request(format!("{field} is required")))?;
    if image.bytes.is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    if !is_image(image.content_type.as_deref()) {
        return Err(AppError::bad_request(format!("{field} must be an image")));
    }
    Ok(image)
}

#[derive(Deserialize)]
pub struct UserListQuery {
    pub verification: Option<String>,
    pub query: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_users(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(params): Query<UserListQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let mut query = users::table.into_boxed();

    if let Some(status) = params
        .verification
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if !VERIFICATION_STATUSES.contains(&status) {
            return Err(AppError::bad_request(format!(
                "verification must be one of {}",
                VERIFICATION_STATUSES.join(", ")
            )));
        }
        query = query.filter(users::verification_status.eq(status.to_string()));
    }

    if let Some(search) = params.query.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        query = query.filter(
            users::full_name
                .ilike(pattern.clone())
                .or(users::username.ilike(pattern)),
        );
    }

    let mut conn = state.db()?;
    let rows: Vec<User> = query
        .order((users::updated_at.asc(), users::full_name.asc()))
        .limit(clamp_limit(params.limit))
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}

#[derive(Serialize)]
pub struct VerificationImagesResponse {
    pub id_image_url: String,
    pub selfie_url: String,
}

pub async fn verification_images(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<VerificationImagesResponse>> {
    let mut conn = state.db()?;
    let user: User = users::table.find(user_id).first(&mut conn)?;
    drop(conn);

    let (Some(id_key), Some(selfie_key)) = (user.id_image_key, user.selfie_image_key) else {
        return Err(AppError::not_found());
    };

    Ok(Json(VerificationImagesResponse {
        id_image_url: state.presign(&id_key).await?,
        selfie_url: state.presign(&selfie_key).await?,
    }))
}

#[derive(Deserialize)]
pub struct VerificationDecision {
    pub approved: bool,
    pub note: Option<String>,
}

pub async fn review_verification(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<VerificationDecision>,
) -> AppResult<Json<UserResponse>> {
    let note = payload
        .note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty());
    let (status, verified_at, subject) = if payload.approved {
        (
            VERIFICATION_VERIFIED,
            Some(Utc::now().naive_utc()),
            "Account verified",
        )
    } else {
        (VERIFICATION_REJECTED, None, "Account verification rejected")
    };
    let body = match (payload.approved, note) {
        (true, _) => "Your identity was verified. You can now request certificates.".to_string(),
        (false, Some(note)) => format!("Your verification was rejected: {note}"),
        (false, None) => {
            "Your verification was rejected. Please upload clearer photos.".to_string()
        }
    };

    let mut conn = state.db()?;
    let updated = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let updated: Option<User> = diesel::update(
            users::table
                .filter(users::id.eq(user_id))
                .filter(users::verification_status.eq(VERIFICATION_SUBMITTED)),
        )
        .set((
            users::verification_status.eq(status),
            users::verified_at.eq(verified_at),
            users::verified_by.eq(Some(staff.user_id)),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(conn)
        .optional()?;

        if let Some(user) = &updated {
            deliver(conn, Delivery::notification(user.id, subject, &body))?;
        }
        Ok(updated)
    })?;

    let Some(updated) = updated else {
        let exists: bool = diesel::select(diesel::dsl::exists(users::table.find(user_id)))
            .get_result(&mut conn)?;
        return Err(if exists {
            AppError::conflict("user has no pending verification")
        } else {
            AppError::not_found()
        });
    };

    info!(
        user_id = %updated.id,
        reviewer_id = %staff.user_id,
        status,
        "verification reviewed"
    );
    Ok(Json(updated.into()))
}

#[derive(Deserialize)]
pub struct RoleUpdate {
    pub role: String,
}

pub async fn update_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RoleUpdate>,
) -> AppResult<Json<UserResponse>> {
    let role = normalize_role(&payload.role)
        .ok_or_else(|| AppError::bad_request("role must be resident, staff or admin"))?;
    if user_id == admin.user_id {
        return Err(AppError::bad_request("admins cannot change their own role"));
    }

    let mut conn = state.db()?;
    let updated: User = diesel::update(users::table.find(user_id))
        .set((
            users::role.eq(role),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)?;

    info!(user_id = %updated.id, admin_id = %admin.user_id, role, "role updated");
    Ok(Json(updated.into()))
}
