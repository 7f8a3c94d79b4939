use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod announcements;
pub mod auth;
pub mod backup;
pub mod certificates;
pub mod health;
pub mod inbox;
pub mod officials;
pub mod requests;
pub mod revenues;
pub mod settings;
pub mod users;

pub fn create_router(state: AppState) -> Result<Router<()>> {
    let allow_origin = match state.config.cors_allowed_origin.as_ref() {
        Some(origins) => {
            let headers = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| {
                    value
                        .parse::<HeaderValue>()
                        .with_context(|| format!("invalid CORS allowed origin {value:?}"))
                })
                .collect::<Result<Vec<_>>>()?;
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let users_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/me", patch(users::update_profile))
        .route("/me/verification", post(users::submit_verification))
        .route(
            "/:id/verification-images",
            get(users::verification_images),
        )
        .route("/:id/verification", post(users::review_verification))
        .route("/:id/role", patch(users::update_role));

    let requests_routes = Router::new()
        .route(
            "/",
            get(requests::list_queue).post(requests::submit_request),
        )
        .route("/mine", get(requests::list_mine))
        .route("/:id", get(requests::get_request))
        .route("/:id/proof", get(requests::proof_url))
        .route("/:id/approve", post(requests::approve))
        .route("/:id/decline", post(requests::decline))
        .route("/:id/certificate", get(certificates::certificate_for_request));

    let certificate_routes =
        Router::new().route("/:token", get(certificates::certificate_by_token));

    let messages_routes = Router::new()
        .route("/", get(inbox::list_messages).post(inbox::send_message))
        .route("/unread-count", get(inbox::unread_messages))
        .route("/:id/read", post(inbox::read_message));

    let notifications_routes = Router::new()
        .route("/", get(inbox::list_notifications))
        .route("/unread-count", get(inbox::unread_notifications))
        .route("/read-all", post(inbox::read_all_notifications))
        .route("/:id/read", post(inbox::read_notification));

    let announcements_routes = Router::new()
        .route(
            "/",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .route(
            "/:id",
            patch(announcements::update_announcement)
                .delete(announcements::delete_announcement),
        );

    let officials_routes = Router::new()
        .route(
            "/",
            get(officials::list_officials).post(officials::create_official),
        )
        .route(
            "/:id",
            patch(officials::update_official).delete(officials::delete_official),
        );

    let revenues_routes = Router::new()
        .route("/", get(revenues::list_revenues))
        .route("/summary", get(revenues::revenue_summary));

    let max_upload_bytes = state.config.max_upload_bytes;

    Ok(Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", users_routes)
        .nest("/api/requests", requests_routes)
        .nest("/api/certificates", certificate_routes)
        .nest("/api/messages", messages_routes)
        .nest("/api/notifications", notifications_routes)
        .nest("/api/announcements", announcements_routes)
        .nest("/api/officials", officials_routes)
        .nest("/api/revenues", revenues_routes)
        .route(
            "/api/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/api/backup", post(backup::create_backup))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_upload_bytes)))
}
