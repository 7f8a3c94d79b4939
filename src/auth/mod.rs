pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

pub const ROLE_RESIDENT: &str = "resident";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLES: &[&str] = &[ROLE_RESIDENT, ROLE_STAFF, ROLE_ADMIN];

pub const VERIFICATION_UNVERIFIED: &str = "unverified";
pub const VERIFICATION_SUBMITTED: &str = "submitted";
pub const VERIFICATION_VERIFIED: &str = "verified";
pub const VERIFICATION_REJECTED: &str = "rejected";
pub const VERIFICATION_STATUSES: &[&str] = &[
    VERIFICATION_UNVERIFIED,
    VERIFICATION_SUBMITTED,
    VERIFICATION_VERIFIED,
    VERIFICATION_REJECTED,
];

pub fn normalize_role(value: &str) -> Option<&'static str> {
    let value = value.trim();
    ROLES
        .iter()
        .copied()
        .find(|role| role.eq_ignore_ascii_case(value))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: uuid::Uuid,
    pub username: String,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Staff and admins work the office side of the portal.
    pub fn is_staff(&self) -> bool {
        self.role == ROLE_STAFF || self.is_admin()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        })
    }
}

pub struct StaffUser(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_staff() {
            return Err(AppError::forbidden("staff access required"));
        }
        Ok(StaffUser(user))
    }
}

pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::forbidden("admin access required"));
        }
        Ok(AdminUser(user))
    }
}
