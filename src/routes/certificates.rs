use axum::{
    extract::{Path, State},
    Json,
};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use tracing::warn;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::barangay::{load_officials, load_settings};
use crate::certificate::{compose, CertificateView};
use crate::error::{AppError, AppResult};
use crate::models::CertificateRequest;
use crate::routes::requests::load_visible_request;
use crate::schema::certificate_requests;
use crate::state::AppState;

/// Public view behind a certificate link; the signed token is the only credential.
pub async fn certificate_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<CertificateView>> {
    let claims = state.jwt.verify_certificate_token(&token).map_err(|err| {
        warn!(error = %err, "rejected certificate token");
        AppError::not_found()
    })?;

    let mut conn = state.db()?;
    let request: CertificateRequest = certificate_requests::table
        .find(claims.req_id)
        .first(&mut conn)?;
    render(&mut conn, &request)
}

pub async fn certificate_for_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<CertificateView>> {
    let mut conn = state.db()?;
    let request = load_visible_request(&mut conn, request_id, &user)?;
    render(&mut conn, &request)
}

fn render(
    conn: &mut PgConnection,
    request: &CertificateRequest,
) -> AppResult<Json<CertificateView>> {
    let settings = load_settings(conn)?;
    let officials = load_officials(conn)?;
    Ok(Json(compose(request, &settings, &officials)?))
}
