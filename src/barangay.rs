//! Barangay profile settings and the roster of officials shown on certificates.

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::models::{Official, Setting};
use crate::schema::{officials, settings};

pub const SETTINGS_KEY: &str = "barangay";

pub const POSITION_CAPTAIN: &str = "captain";
pub const POSITION_KAGAWAD: &str = "kagawad";

/// Every position but `kagawad` can be held by one official at a time.
pub const POSITIONS: &[(&str, &str)] = &[
    (POSITION_CAPTAIN, "Punong Barangay"),
    (POSITION_KAGAWAD, "Barangay Kagawad"),
    ("sk-chairperson", "SK Chairperson"),
    ("secretary", "Barangay Secretary"),
    ("treasurer", "Barangay Treasurer"),
];

pub fn normalize_position(value: &str) -> Option<&'static str> {
    let value = value.trim();
    POSITIONS
        .iter()
        .map(|(slug, _)| *slug)
        .find(|slug| slug.eq_ignore_ascii_case(value))
}

pub fn position_label(position: &str) -> &str {
    POSITIONS
        .iter()
        .find(|(slug, _)| *slug == position)
        .map(|(_, label)| *label)
        .unwrap_or(position)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BarangaySettings {
    pub barangay_name: String,
    pub municipality: String,
    pub province: String,
    #[serde(default)]
    pub office_address: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
}

impl Default for BarangaySettings {
    fn default() -> Self {
        Self {
            barangay_name: "Barangay".to_string(),
            municipality: "Municipality".to_string(),
            province: "Province".to_string(),
            office_address: None,
            contact_email: None,
            contact_number: None,
        }
    }
}

impl BarangaySettings {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("barangay_name", &self.barangay_name),
            ("municipality", &self.municipality),
            ("province", &self.province),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        Ok(())
    }
}

/// Falls back to defaults until an admin saves the profile. A stored profile that no longer
/// parses is an error rather than a silent fallback.
pub fn load_settings(conn: &mut PgConnection) -> QueryResult<BarangaySettings> {
    let row: Option<Setting> = settings::table
        .find(SETTINGS_KEY)
        .first(conn)
        .optional()?;

    let Some(row) = row else {
        return Ok(BarangaySettings::default());
    };
    parse_settings(row.value).map_err(|err| {
        error!(key = SETTINGS_KEY, error = %err, "stored barangay settings are corrupt");
        diesel::result::Error::DeserializationError(Box::new(err))
    })
}

fn parse_settings(value: serde_json::Value) -> serde_json::Result<BarangaySettings> {
    serde_json::from_value(value)
}

pub fn save_settings(conn: &mut PgConnection, value: &BarangaySettings) -> QueryResult<()> {
    let json = serde_json::to_value(value)
        .map_err(|err| diesel::result::Error::SerializationError(Box::new(err)))?;
    let now = Utc::now().naive_utc();

    diesel::insert_into(settings::table)
        .values((
            settings::key.eq(SETTINGS_KEY),
            settings::value.eq(json),
            settings::updated_at.eq(now),
        ))
        .on_conflict(settings::key)
        .do_update()
        .set((
            settings::value.eq(excluded(settings::value)),
            settings::updated_at.eq(excluded(settings::updated_at)),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn load_officials(conn: &mut PgConnection) -> QueryResult<Vec<Official>> {
    officials::table
        .order((officials::display_order.asc(), officials::name.asc()))
        .load(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_normalize_case_insensitively() {
        assert_eq!(normalize_position(" Captain"), Some(POSITION_CAPTAIN));
        assert_eq!(normalize_position("SK-Chairperson"), Some("sk-chairperson"));
        assert_eq!(normalize_position("mayor"), None);
    }

    #[test]
    fn labels_fall_back_to_raw_position() {
        assert_eq!(position_label(POSITION_CAPTAIN), "Punong Barangay");
        assert_eq!(position_label("tanod"), "tanod");
    }

    #[test]
    fn settings_require_core_names() {
        let mut settings = BarangaySettings::default();
        assert!(settings.validate().is_ok());
        settings.province = " ".into();
        assert_eq!(settings.validate().unwrap_err(), "province must not be empty");
    }

    #[test]
    fn settings_tolerate_missing_optional_fields() {
        let parsed: BarangaySettings = serde_json::from_value(serde_json::json!({
            "barangay_name": "San Isidro",
            "municipality": "Tanay",
            "province": "Rizal"
        }))
        .unwrap();
        assert_eq!(parsed.office_address, None);
    }

    #[test]
    fn corrupt_settings_are_not_replaced_by_defaults() {
        assert!(parse_settings(serde_json::json!({ "barangay_name": 7 })).is_err());
        assert!(parse_settings(serde_json::json!("San Isidro")).is_err());
    }
}
