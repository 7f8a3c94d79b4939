use axum::{extract::State, http::StatusCode, response::Json};
use diesel::prelude::*;
use diesel::sql_query;
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = state
        .pool
        .get()
        .map_err(|err| err.to_string())
        .and_then(|mut conn| {
            sql_query("SELECT 1")
                .execute(&mut conn)
                .map_err(|err| err.to_string())
        });

    match database {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(err) => {
            warn!(error = %err, "health check could not reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unreachable" })),
            )
        }
    }
}
