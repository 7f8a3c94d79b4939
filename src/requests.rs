use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use thiserror::Error;
use uuid::Uuid;

use crate::certificate::certificate_title;
use crate::inbox::{deliver, Delivery};
use crate::models::{
    CertificateRequest, NewRevenue, FORMAT_MAX_CHARS, NAME_MAX_CHARS, REQUEST_TYPE_MAX_CHARS,
    SITIO_MAX_CHARS,
};
use crate::schema::{certificate_requests, revenues};
use crate::utils::check_max_chars;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_DECLINED: &str = "declined";
pub const STATUSES: &[&str] = &[STATUS_PENDING, STATUS_APPROVED, STATUS_DECLINED];

pub const PURPOSE_OTHERS: &str = "others";

pub const DEFAULT_QUEUE_LIMIT: i64 = 100;
pub const MAX_QUEUE_LIMIT: i64 = 500;

/// ₱100,000,000.00. Keeps ledger totals far from `i64` overflow.
pub const MAX_AMOUNT_CENTAVOS: i64 = 10_000_000_000;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("request not found")]
    NotFound,
    #[error("request has already been {0}")]
    AlreadyReviewed(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type ReviewResult<T> = Result<T, ReviewError>;

/// Raw text fields of a request submission, as they arrive in the multipart form.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub request_type: Option<String>,
    pub purpose: Option<String>,
    pub other_purpose: Option<String>,
    pub sitio: Option<String>,
    pub amount_centavos: Option<String>,
    pub submitted_name: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Submission {
    pub request_type: String,
    pub purpose: String,
    pub other_purpose: Option<String>,
    pub sitio: String,
    pub amount_centavos: i64,
    pub submitted_name: Option<String>,
    pub format: Option<String>,
}

impl SubmissionForm {
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "request_type" => &mut self.request_type,
            "purpose" => &mut self.purpose,
            "other_purpose" => &mut self.other_purpose,
            "sitio" => &mut self.sitio,
            "amount_centavos" => &mut self.amount_centavos,
            "submitted_name" => &mut self.submitted_name,
            "format" => &mut self.format,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    pub fn validate(self) -> Result<Submission, String> {
        let request_type = required(self.request_type, "request_type")?;
        let purpose = required(self.purpose, "purpose")?;
        let sitio = required(self.sitio, "sitio")?;
        let other_purpose = optional(self.other_purpose);

        if purpose.eq_ignore_ascii_case(PURPOSE_OTHERS) && other_purpose.is_none() {
            return Err("other_purpose is required when purpose is Others".to_string());
        }

        let amount_raw = required(self.amount_centavos, "amount_centavos")?;
        let amount_centavos: i64 = amount_raw
            .parse()
            .map_err(|_| "amount_centavos must be a whole number".to_string())?;
        if amount_centavos < 0 {
            return Err("amount_centavos must not be negative".to_string());
        }
        if amount_centavos > MAX_AMOUNT_CENTAVOS {
            return Err(format!("amount_centavos must be at most {MAX_AMOUNT_CENTAVOS}"));
        }

        let submitted_name = optional(self.submitted_name);
        let format = optional(self.format);
        check_max_chars("request_type", &request_type, REQUEST_TYPE_MAX_CHARS)?;
        check_max_chars("purpose", &purpose, NAME_MAX_CHARS)?;
        check_max_chars("sitio", &sitio, SITIO_MAX_CHARS)?;
        if let Some(other_purpose) = &other_purpose {
            check_max_chars("other_purpose", other_purpose, NAME_MAX_CHARS)?;
        }
        if let Some(submitted_name) = &submitted_name {
            check_max_chars("submitted_name", submitted_name, NAME_MAX_CHARS)?;
        }
        if let Some(format) = &format {
            check_max_chars("format", format, FORMAT_MAX_CHARS)?;
        }

        Ok(Submission {
            request_type,
            purpose,
            other_purpose,
            sitio,
            amount_centavos,
            submitted_name,
            format,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    optional(value).ok_or_else(|| format!("{field} is required"))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_QUEUE_LIMIT)
        .clamp(1, MAX_QUEUE_LIMIT)
}

/// Escapes LIKE wildcards so user search text matches literally.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub struct QueueFilter<'a> {
    pub status: &'a str,
    pub search: Option<&'a str>,
    pub limit: i64,
}

/// The pending queue is served oldest first; reviewed requests newest first.
pub fn list_requests(
    conn: &mut PgConnection,
    filter: QueueFilter<'_>,
) -> QueryResult<Vec<CertificateRequest>> {
    let mut query = certificate_requests::table
        .filter(certificate_requests::status.eq(filter.status.to_string()))
        .into_boxed();

    if let Some(search) = filter.search.map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        query = query.filter(
            certificate_requests::submitted_name
                .ilike(pattern.clone())
                .or(certificate_requests::request_type.ilike(pattern.clone()))
                .or(certificate_requests::purpose.ilike(pattern)),
        );
    }

    query = if filter.status == STATUS_PENDING {
        query.order(certificate_requests::created_at.asc())
    } else {
        query.order(certificate_requests::created_at.desc())
    };

    query.limit(filter.limit).load(conn)
}

pub struct Approval<'a> {
    pub reviewer_id: Uuid,
    pub issue_on: NaiveDate,
    pub affiant: &'a str,
    pub format: Option<&'a str>,
    pub cert_link: &'a str,
}

#[derive(AsChangeset)]
#[diesel(table_name = certificate_requests)]
struct ApprovalChangeset<'a> {
    status: &'a str,
    issue_on: Option<NaiveDate>,
    affiant: Option<&'a str>,
    format: Option<&'a str>,
    cert_link: Option<&'a str>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<NaiveDateTime>,
    updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = certificate_requests)]
struct DeclineChangeset<'a> {
    status: &'a str,
    decline_reason: Option<&'a str>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<NaiveDateTime>,
    updated_at: NaiveDateTime,
}

/// Moves a pending request to `approved` and, in the same transaction, tells the resident and
/// books the fee in the revenue ledger.
pub fn approve_request(
    conn: &mut PgConnection,
    request_id: Uuid,
    approval: &Approval<'_>,
) -> ReviewResult<CertificateRequest> {
    conn.transaction(|conn| {
        let now = Utc::now().naive_utc();
        let changes = ApprovalChangeset {
            status: STATUS_APPROVED,
            issue_on: Some(approval.issue_on),
            affiant: Some(approval.affiant),
            format: approval.format,
            cert_link: Some(approval.cert_link),
            reviewed_by: Some(approval.reviewer_id),
            reviewed_at: Some(now),
            updated_at: now,
        };

        let Some(request) = diesel::update(
            certificate_requests::table
                .filter(certificate_requests::id.eq(request_id))
                .filter(certificate_requests::status.eq(STATUS_PENDING)),
        )
        .set(&changes)
        .get_result::<CertificateRequest>(conn)
        .optional()?
        else {
            return Err(not_pending(conn, request_id)?);
        };

        let title = certificate_title(&request.request_type);
        let subject = format!("{title} approved");
        let body = format!(
            "Your request for a {title} was approved and will be issued on {}.",
            approval.issue_on.format("%B %-d, %Y")
        );

        deliver(
            conn,
            Delivery::message(
                Some(approval.reviewer_id),
                Some(request.submitted_by),
                &subject,
                &body,
            )
            .with_link(Some(approval.cert_link)),
        )?;
        deliver(
            conn,
            Delivery::notification(request.submitted_by, &subject, &body)
                .with_link(Some(approval.cert_link)),
        )?;

        diesel::insert_into(revenues::table)
            .values(&NewRevenue {
                id: Uuid::new_v4(),
                request_id: request.id,
                payer_name: request.submitted_name.clone(),
                request_type: request.request_type.clone(),
                amount_centavos: request.amount_centavos,
                recorded_by: approval.reviewer_id,
            })
            .execute(conn)?;

        Ok(request)
    })
}

pub fn decline_request(
    conn: &mut PgConnection,
    request_id: Uuid,
    reviewer_id: Uuid,
    reason: &str,
) -> ReviewResult<CertificateRequest> {
    conn.transaction(|conn| {
        let now = Utc::now().naive_utc();
        let changes = DeclineChangeset {
            status: STATUS_DECLINED,
            decline_reason: Some(reason),
            reviewed_by: Some(reviewer_id),
            reviewed_at: Some(now),
            updated_at: now,
        };

        let Some(request) = diesel::update(
            certificate_requests::table
                .filter(certificate_requests::id.eq(request_id))
                .filter(certificate_requests::status.eq(STATUS_PENDING)),
        )
        .set(&changes)
        .get_result::<CertificateRequest>(conn)
        .optional()?
        else {
            return Err(not_pending(conn, request_id)?);
        };

        let title = certificate_title(&request.request_type);
        let subject = format!("{title} declined");
        let body = format!("Your request for a {title} was declined: {reason}");

        deliver(
            conn,
            Delivery::message(Some(reviewer_id), Some(request.submitted_by), &subject, &body),
        )?;
        deliver(
            conn,
            Delivery::notification(request.submitted_by, &subject, &body),
        )?;

        Ok(request)
    })
}

fn not_pending(conn: &mut PgConnection, request_id: Uuid) -> ReviewResult<ReviewError> {
    let status: Option<String> = certificate_requests::table
        .find(request_id)
        .select(certificate_requests::status)
        .first(conn)
        .optional()?;

    Ok(match status {
        None => ReviewError::NotFound,
        Some(status) => ReviewError::AlreadyReviewed(status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> SubmissionForm {
        SubmissionForm {
            request_type: Some("barangay-clearance".into()),
            purpose: Some(" Employment ".into()),
            other_purpose: None,
            sitio: Some("Sitio Maligaya".into()),
            amount_centavos: Some("5000".into()),
            submitted_name: Some("  ".into()),
            format: None,
        }
    }

    #[test]
    fn complete_form_validates_and_trims() {
        let submission = complete_form().validate().unwrap();
        assert_eq!(submission.purpose, "Employment");
        assert_eq!(submission.amount_centavos, 5000);
        assert_eq!(submission.submitted_name, None);
    }

    #[test]
    fn missing_sitio_is_rejected() {
        let mut form = complete_form();
        form.sitio = Some("   ".into());
        assert_eq!(form.validate().unwrap_err(), "sitio is required");
    }

    #[test]
    fn others_purpose_requires_detail() {
        let mut form = complete_form();
        form.purpose = Some("Others".into());
        assert!(form.validate().is_err());

        let mut form = complete_form();
        form.purpose = Some("others".into());
        form.other_purpose = Some("Scholarship application".into());
        let submission = form.validate().unwrap();
        assert_eq!(
            submission.other_purpose.as_deref(),
            Some("Scholarship application")
        );
    }

    #[test]
    fn amount_must_be_non_negative_integer() {
        let mut form = complete_form();
        form.amount_centavos = Some("-1".into());
        assert!(form.validate().is_err());

        let mut form = complete_form();
        form.amount_centavos = Some("50.00".into());
        assert!(form.validate().is_err());
    }

    #[test]
    fn amount_is_capped() {
        let mut form = complete_form();
        form.amount_centavos = Some(MAX_AMOUNT_CENTAVOS.to_string());
        assert!(form.validate().is_ok());

        let mut form = complete_form();
        form.amount_centavos = Some(i64::MAX.to_string());
        assert!(form.validate().is_err());
    }

    #[test]
    fn over_long_fields_are_rejected() {
        let mut form = complete_form();
        form.sitio = Some("s".repeat(SITIO_MAX_CHARS + 1));
        assert_eq!(
            form.validate().unwrap_err(),
            "sitio must be at most 100 characters"
        );

        let mut form = complete_form();
        form.format = Some("f".repeat(FORMAT_MAX_CHARS + 1));
        assert!(form.validate().is_err());

        let mut form = complete_form();
        form.submitted_name = Some("n".repeat(NAME_MAX_CHARS));
        assert!(form.validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut form = SubmissionForm::default();
        assert!(form.set("sitio", "Proper".into()));
        assert!(!form.set("status", "approved".into()));
        assert_eq!(form.sitio.as_deref(), Some("Proper"));
    }

    #[test]
    fn queue_limit_is_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_QUEUE_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_QUEUE_LIMIT);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("dela cruz"), "%dela cruz%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
