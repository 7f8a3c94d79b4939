use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Days, NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::auth::StaffUser;
use crate::certificate::peso;
use crate::error::{AppError, AppResult};
use crate::models::Revenue;
use crate::schema::revenues;
use crate::state::AppState;
use crate::utils::to_iso;

#[derive(Deserialize)]
pub struct RevenueRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RevenueRange {
    /// `from` and `to` are inclusive calendar days.
    fn bounds(&self) -> AppResult<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::bad_request("from must not be after to"));
            }
        }
        let start = self.from.and_then(|day| day.and_hms_opt(0, 0, 0));
        let end = self
            .to
            .and_then(|day| day.checked_add_days(Days::new(1)))
            .and_then(|day| day.and_hms_opt(0, 0, 0));
        Ok((start, end))
    }
}

fn ranged(
    range: &RevenueRange,
) -> AppResult<revenues::BoxedQuery<'static, diesel::pg::Pg>> {
    let (start, end) = range.bounds()?;
    let mut query = revenues::table.into_boxed();
    if let Some(start) = start {
        query = query.filter(revenues::recorded_at.ge(start));
    }
    if let Some(end) = end {
        query = query.filter(revenues::recorded_at.lt(end));
    }
    Ok(query)
}

#[derive(Serialize)]
pub struct RevenueResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub payer_name: String,
    pub request_type: String,
    pub amount_centavos: i64,
    pub recorded_by: Uuid,
    pub recorded_at: String,
}

impl From<Revenue> for RevenueResponse {
    fn from(revenue: Revenue) -> Self {
        Self {
            id: revenue.id,
            request_id: revenue.request_id,
            payer_name: revenue.payer_name,
            request_type: revenue.request_type,
            amount_centavos: revenue.amount_centavos,
            recorded_by: revenue.recorded_by,
            recorded_at: to_iso(revenue.recorded_at),
        }
    }
}

pub async fn list_revenues(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(range): Query<RevenueRange>,
) -> AppResult<Json<Vec<RevenueResponse>>> {
    let query = ranged(&range)?;
    let mut conn = state.db()?;
    let rows: Vec<Revenue> = query
        .order(revenues::recorded_at.desc())
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(RevenueResponse::from).collect()))
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct TypeTotal {
    pub request_type: String,
    pub count: usize,
    pub total_centavos: i64,
}

#[derive(Serialize)]
pub struct RevenueSummary {
    pub count: usize,
    pub total_centavos: i64,
    pub total_text: String,
    pub by_type: Vec<TypeTotal>,
}

pub async fn revenue_summary(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(range): Query<RevenueRange>,
) -> AppResult<Json<RevenueSummary>> {
    let query = ranged(&range)?;
    let mut conn = state.db()?;
    let rows: Vec<Revenue> = query.load(&mut conn)?;

    let count = rows.len();
    let summary = summarize(
        rows.into_iter()
            .map(|revenue| (revenue.request_type, revenue.amount_centavos))
            .collect(),
    )
    .ok_or_else(|| {
        error!(rows = count, "revenue total overflowed");
        AppError::internal("revenue total is out of range")
    })?;

    Ok(Json(summary))
}

/// `None` when a total does not fit in `i64`.
fn summarize(rows: Vec<(String, i64)>) -> Option<RevenueSummary> {
    let mut by_type: BTreeMap<String, (usize, i64)> = BTreeMap::new();
    let mut total_centavos: i64 = 0;
    for (request_type, amount) in &rows {
        let entry = by_type.entry(request_type.clone()).or_default();
        entry.0 += 1;
        entry.1 = entry.1.checked_add(*amount)?;
        total_centavos = total_centavos.checked_add(*amount)?;
    }

    Some(RevenueSummary {
        count: rows.len(),
        total_centavos,
        total_text: peso(total_centavos),
        by_type: by_type
            .into_iter()
            .map(|(request_type, (count, total_centavos))| TypeTotal {
                request_type,
                count,
                total_centavos,
            })
            .collect(),
    })
}
