use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, StaffUser, VERIFICATION_VERIFIED};
use crate::error::{AppError, AppResult};
use crate::models::{
    CertificateRequest, NewCertificateRequest, User, FORMAT_MAX_CHARS, NAME_MAX_CHARS,
};
use crate::requests::{
    approve_request, clamp_limit, decline_request, list_requests, Approval, QueueFilter,
    SubmissionForm, STATUSES, STATUS_PENDING,
};
use crate::schema::{certificate_requests, users};
use crate::state::AppState;
use crate::storage::{inline_content_disposition, is_image, proof_key, resolve_content_type};
use crate::utils::{check_max_chars, to_iso};

#[derive(Serialize)]
pub struct RequestResponse {
    pub id: Uuid,
    pub submitted_by: Uuid,
    pub submitted_name: String,
    pub sitio: String,
    pub request_type: String,
    pub purpose: String,
    pub other_purpose: Option<String>,
    pub amount_centavos: i64,
    pub format: Option<String>,
    pub status: String,
    pub issue_on: Option<NaiveDate>,
    pub affiant: Option<String>,
    pub cert_link: Option<String>,
    pub decline_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CertificateRequest> for RequestResponse {
    fn from(request: CertificateRequest) -> Self {
        Self {
            id: request.id,
            submitted_by: request.submitted_by,
            submitted_name: request.submitted_name,
            sitio: request.sitio,
            request_type: request.request_type,
            purpose: request.purpose,
            other_purpose: request.other_purpose,
            amount_centavos: request.amount_centavos,
            format: request.format,
            status: request.status,
            issue_on: request.issue_on,
            affiant: request.affiant,
            cert_link: request.cert_link,
            decline_reason: request.decline_reason,
            reviewed_by: request.reviewed_by,
            reviewed_at: request.reviewed_at.map(to_iso),
            created_at: to_iso(request.created_at),
            updated_at: to_iso(request.updated_at),
        }
    }
}

/// Loads a request the caller may see: their own, or any request for staff. Others get 404.
pub(crate) fn load_visible_request(
    conn: &mut PgConnection,
    request_id: Uuid,
    user: &AuthenticatedUser,
) -> AppResult<CertificateRequest> {
    let request: CertificateRequest = certificate_requests::table.find(request_id).first(conn)?;
    if request.submitted_by != user.user_id && !user.is_staff() {
        return Err(AppError::not_found());
    }
    Ok(request)
}

struct ProofUpload {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

pub async fn submit_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<RequestResponse>)> {
    let mut form = SubmissionForm::default();
    let mut proof: Option<ProofUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string()).unwrap_or_default();
        if name == "proof" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let declared = field.content_type().map(|mime| mime.to_string());
            let bytes = field.bytes().await.map_err(|err| {
                error!(error = %err, "failed to read proof of payment");
                AppError::bad_request(format!("failed to read file bytes: {err}"))
            })?;
            proof = Some(ProofUpload {
                content_type: resolve_content_type(declared.as_deref(), &file_name),
                file_name,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(|err| {
            AppError::bad_request(format!("invalid value for {name}: {err}"))
        })?;
        form.set(&name, value);
    }

    let submission = form.validate().map_err(|msg| {
        warn!(user_id = %user.user_id, reason = %msg, "request submission rejected");
        AppError::bad_request(msg)
    })?;

    let proof = proof.ok_or_else(|| AppError::bad_request("proof is required"))?;
    if proof.bytes.is_empty() {
        return Err(AppError::bad_request("proof must not be empty"));
    }
    if !is_image(proof.content_type.as_deref()) {
        return Err(AppError::bad_request("proof must be an image"));
    }

    let mut conn = state.db()?;
    let submitter: User = users::table.find(user.user_id).first(&mut conn)?;
    if !user.is_staff() && submitter.verification_status != VERIFICATION_VERIFIED {
        return Err(AppError::forbidden(
            "only verified residents can request certificates",
        ));
    }

    let request_id = Uuid::new_v4();
    let key = proof_key(request_id, &proof.file_name);
    state
        .storage
        .put_object(
            &key,
            proof.bytes,
            proof.content_type.clone(),
            inline_content_disposition(&proof.file_name),
        )
        .await
        .map_err(|err| {
            error!(
                request_id = %request_id,
                key = %key,
                error = %err,
                "failed to upload proof of payment"
            );
            AppError::internal("failed to store proof of payment")
        })?;

    let new_request = NewCertificateRequest {
        id: request_id,
        submitted_by: user.user_id,
        submitted_name: submission
            .submitted_name
            .unwrap_or_else(|| submitter.full_name.clone()),
        sitio: submission.sitio,
        request_type: submission.request_type,
        purpose: submission.purpose,
        other_purpose: submission.other_purpose,
        amount_centavos: submission.amount_centavos,
        format: submission.format,
        proof_s3_key: key.clone(),
        proof_content_type: proof.content_type,
        status: STATUS_PENDING.to_string(),
    };

    let created: CertificateRequest = match diesel::insert_into(certificate_requests::table)
        .values(&new_request)
        .get_result(&mut conn)
    {
        Ok(created) => created,
        Err(err) => {
            error!(request_id = %request_id, error = %err, "failed to record request");
            if let Err(cleanup) = state.storage.delete_object(&key).await {
                warn!(key = %key, error = %cleanup, "failed to remove orphaned proof of payment");
            }
            return Err(AppError::from(err));
        }
    };

    info!(
        request_id = %created.id,
        user_id = %user.user_id,
        request_type = %created.request_type,
        amount_centavos = created.amount_centavos,
        "request submitted"
    );
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[derive(Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
    pub query: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_queue(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(params): Query<QueueQuery>,
) -> AppResult<Json<Vec<RequestResponse>>> {
    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(STATUS_PENDING);
    if !STATUSES.contains(&status) {
        return Err(AppError::bad_request(format!(
            "status must be one of {}",
            STATUSES.join(", ")
        )));
    }

    let mut conn = state.db()?;
    let rows = list_requests(
        &mut conn,
        QueueFilter {
            status,
            search: params.query.as_deref(),
            limit: clamp_limit(params.limit),
        },
    )?;

    Ok(Json(rows.into_iter().map(RequestResponse::from).collect()))
}

pub async fn list_mine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<RequestResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<CertificateRequest> = certificate_requests::table
        .filter(certificate_requests::submitted_by.eq(user.user_id))
        .order(certificate_requests::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(RequestResponse::from).collect()))
}

pub async fn get_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<RequestResponse>> {
    let mut conn = state.db()?;
    let request = load_visible_request(&mut conn, request_id, &user)?;
    Ok(Json(request.into()))
}

#[derive(Serialize)]
pub struct ProofResponse {
    pub url: String,
    pub content_type: Option<String>,
}

pub async fn proof_url(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ProofResponse>> {
    let request = {
        let mut conn = state.db()?;
        load_visible_request(&mut conn, request_id, &user)?
    };

    Ok(Json(ProofResponse {
        url: state.presign(&request.proof_s3_key).await?,
        content_type: request.proof_content_type,
    }))
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    pub issue_on: NaiveDate,
    pub affiant: String,
    pub format: Option<String>,
}

pub async fn approve(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> AppResult<Json<RequestResponse>> {
    let affiant = payload.affiant.trim();
    if affiant.is_empty() {
        return Err(AppError::bad_request("affiant must not be empty"));
    }
    let format = payload
        .format
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    check_max_chars("affiant", affiant, NAME_MAX_CHARS).map_err(AppError::bad_request)?;
    if let Some(format) = format {
        check_max_chars("format", format, FORMAT_MAX_CHARS).map_err(AppError::bad_request)?;
    }

    let token = state.jwt.generate_certificate_token(request_id)?;
    let cert_link = state.config.certificate_link(&token);

    let mut conn = state.db()?;
    let approved = approve_request(
        &mut conn,
        request_id,
        &Approval {
            reviewer_id: staff.user_id,
            issue_on: payload.issue_on,
            affiant,
            format,
            cert_link: &cert_link,
        },
    )
    .map_err(|err| {
        warn!(
            request_id = %request_id,
            reviewer_id = %staff.user_id,
            error = %err,
            "approval failed"
        );
        AppError::from(err)
    })?;

    info!(
        request_id = %approved.id,
        reviewer_id = %staff.user_id,
        issue_on = %payload.issue_on,
        amount_centavos = approved.amount_centavos,
        "request approved"
    );
    Ok(Json(approved.into()))
}

#[derive(Deserialize)]
pub struct DeclineRequest {
    pub reason: String,
}

pub async fn decline(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<DeclineRequest>,
) -> AppResult<Json<RequestResponse>> {
    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(AppError::bad_request("reason must not be empty"));
    }

    let mut conn = state.db()?;
    let declined = decline_request(&mut conn, request_id, staff.user_id, reason).map_err(|err| {
        warn!(
            request_id = %request_id,
            reviewer_id = %staff.user_id,
            error = %err,
            "decline failed"
        );
        AppError::from(err)
    })?;

    info!(request_id = %declined.id, reviewer_id = %staff.user_id, "request declined");
    Ok(Json(declined.into()))
}
