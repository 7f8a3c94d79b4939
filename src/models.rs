use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

// VARCHAR widths from the migration, counted in characters.
pub const USERNAME_MAX_CHARS: usize = 100;
pub const NAME_MAX_CHARS: usize = 255;
pub const SITIO_MAX_CHARS: usize = 100;
pub const CONTACT_NUMBER_MAX_CHARS: usize = 32;
pub const REQUEST_TYPE_MAX_CHARS: usize = 100;
pub const FORMAT_MAX_CHARS: usize = 64;
pub const CONTENT_TYPE_MAX_CHARS: usize = 100;
pub const SUBJECT_MAX_CHARS: usize = 255;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
    pub sitio: Option<String>,
    pub contact_number: Option<String>,
    pub verification_status: String,
    pub id_image_key: Option<String>,
    pub selfie_image_key: Option<String>,
    pub verified_at: Option<NaiveDateTime>,
    pub verified_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
    pub sitio: Option<String>,
    pub contact_number: Option<String>,
    pub verification_status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(User))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = certificate_requests)]
pub struct CertificateRequest {
    pub id: Uuid,
    pub submitted_by: Uuid,
    pub submitted_name: String,
    pub sitio: String,
    pub request_type: String,
    pub purpose: String,
    pub other_purpose: Option<String>,
    pub amount_centavos: i64,
    pub format: Option<String>,
    pub proof_s3_key: String,
    pub proof_content_type: Option<String>,
    pub status: String,
    pub issue_on: Option<NaiveDate>,
    pub affiant: Option<String>,
    pub cert_link: Option<String>,
    pub decline_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = certificate_requests)]
pub struct NewCertificateRequest {
    pub id: Uuid,
    pub submitted_by: Uuid,
    pub submitted_name: String,
    pub sitio: String,
    pub request_type: String,
    pub purpose: String,
    pub other_purpose: Option<String>,
    pub amount_centavos: i64,
    pub format: Option<String>,
    pub proof_s3_key: String,
    pub proof_content_type: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = inbox_items)]
pub struct InboxItem {
    pub id: Uuid,
    pub kind: String,
    pub sender_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub subject: String,
    pub body: String,
    pub link: Option<String>,
    pub read: bool,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inbox_items)]
pub struct NewInboxItem {
    pub id: Uuid,
    pub kind: String,
    pub sender_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub subject: String,
    pub body: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = revenues)]
#[diesel(belongs_to(CertificateRequest, foreign_key = request_id))]
pub struct Revenue {
    pub id: Uuid,
    pub request_id: Uuid,
    pub payer_name: String,
    pub request_type: String,
    pub amount_centavos: i64,
    pub recorded_by: Uuid,
    pub recorded_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = revenues)]
pub struct NewRevenue {
    pub id: Uuid,
    pub request_id: Uuid,
    pub payer_name: String,
    pub request_type: String,
    pub amount_centavos: i64,
    pub recorded_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = announcements)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub posted_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = announcements)]
pub struct NewAnnouncement {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub posted_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = officials)]
pub struct Official {
    pub id: Uuid,
    pub name: String,
    pub position: String,
    pub display_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = officials)]
pub struct NewOfficial {
    pub id: Uuid,
    pub name: String,
    pub position: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = settings)]
#[diesel(primary_key(key))]
pub struct Setting {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: NaiveDateTime,
}
