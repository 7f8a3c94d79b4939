//! Print-ready view of an issued certificate.
//!
//! Layout is left to the client; this module decides the wording, the header lines and who
//! signs.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::barangay::{position_label, BarangaySettings, POSITION_CAPTAIN};
use crate::models::{CertificateRequest, Official};
use crate::requests::{PURPOSE_OTHERS, STATUS_APPROVED};

const KNOWN_TITLES: &[(&str, &str)] = &[
    ("barangay-clearance", "Barangay Clearance"),
    ("certificate-of-residency", "Certificate of Residency"),
    ("certificate-of-indigency", "Certificate of Indigency"),
    ("good-moral", "Certificate of Good Moral Character"),
    ("business-permit", "Barangay Business Permit"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CertificateError {
    #[error("request has not been approved")]
    NotIssued,
}

#[derive(Debug, Serialize)]
pub struct CertificateHeader {
    pub republic: String,
    pub province: String,
    pub municipality: String,
    pub barangay: String,
    pub office: String,
}

#[derive(Debug, Serialize)]
pub struct OfficialLine {
    pub name: String,
    pub position: String,
}

#[derive(Debug, Serialize)]
pub struct CertificateView {
    pub request_id: Uuid,
    pub title: String,
    pub header: CertificateHeader,
    pub recipient_name: String,
    pub sitio: String,
    pub purpose: String,
    pub issued_on: NaiveDate,
    pub issued_on_text: String,
    pub affiant: Option<String>,
    pub format: Option<String>,
    pub fee_centavos: i64,
    pub fee_text: String,
    pub body: Vec<String>,
    pub signatory: Option<OfficialLine>,
    pub officials: Vec<OfficialLine>,
}

pub fn certificate_title(request_type: &str) -> String {
    let normalized = request_type.trim().to_lowercase();
    if let Some((_, title)) = KNOWN_TITLES.iter().find(|(slug, _)| *slug == normalized) {
        return (*title).to_string();
    }

    normalized
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| match word {
            "of" | "and" | "for" => word.to_string(),
            _ => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn compose(
    request: &CertificateRequest,
    settings: &BarangaySettings,
    officials: &[Official],
) -> Result<CertificateView, CertificateError> {
    if request.status != STATUS_APPROVED {
        return Err(CertificateError::NotIssued);
    }
    let issued_on = request.issue_on.ok_or(CertificateError::NotIssued)?;

    let title = certificate_title(&request.request_type);
    let purpose = display_purpose(request);
    let issued_on_text = long_date(issued_on);
    let place = format!(
        "Barangay {}, {}, {}",
        settings.barangay_name, settings.municipality, settings.province
    );

    let body = vec![
        "TO WHOM IT MAY CONCERN:".to_string(),
        format!(
            "This is to certify that {}, a bona fide resident of {}, {}, is known to this office.",
            request.submitted_name.to_uppercase(),
            request.sitio,
            place
        ),
        format!(
            "This {title} is issued upon the request of the above-named person for {purpose}."
        ),
        format!("Issued this {issued_on_text} at {place}."),
    ];

    let officials_lines: Vec<OfficialLine> = officials
        .iter()
        .map(|official| OfficialLine {
            name: official.name.clone(),
            position: position_label(&official.position).to_string(),
        })
        .collect();

    let signatory = officials
        .iter()
        .find(|official| official.position == POSITION_CAPTAIN)
        .map(|official| OfficialLine {
            name: official.name.clone(),
            position: position_label(&official.position).to_string(),
        });

    Ok(CertificateView {
        request_id: request.id,
        title,
        header: CertificateHeader {
            republic: "Republic of the Philippines".to_string(),
            province: format!("Province of {}", settings.province),
            municipality: format!("Municipality of {}", settings.municipality),
            barangay: format!("Barangay {}", settings.barangay_name),
            office: "Office of the Punong Barangay".to_string(),
        },
        recipient_name: request.submitted_name.clone(),
        sitio: request.sitio.clone(),
        purpose,
        issued_on,
        issued_on_text,
        affiant: request.affiant.clone(),
        format: request.format.clone(),
        fee_centavos: request.amount_centavos,
        fee_text: peso(request.amount_centavos),
        body,
        signatory,
        officials: officials_lines,
    })
}

fn display_purpose(request: &CertificateRequest) -> String {
    match &request.other_purpose {
        Some(other) if request.purpose.eq_ignore_ascii_case(PURPOSE_OTHERS) => other.clone(),
        _ => request.purpose.clone(),
    }
}

/// "19th day of October, 2026"
pub fn long_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix} day of {}", date.format("%B, %Y"))
}

/// Formats centavos as pesos with thousands separators, e.g. `₱1,250.00`.
pub fn peso(centavos: i64) -> String {
    let sign = if centavos < 0 { "-" } else { "" };
    let centavos = centavos.unsigned_abs();
    let whole = (centavos / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}₱{grouped}.{:02}", centavos % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 1)
            .and_then(|date| date.and_hms_opt(8, 0, 0))
            .unwrap()
    }

    fn approved_request() -> CertificateRequest {
        let now = timestamp();
        CertificateRequest {
            id: Uuid::nil(),
            submitted_by: Uuid::nil(),
            submitted_name: "Maria Dela Cruz".into(),
            sitio: "Sitio Maligaya".into(),
            request_type: "certificate-of-indigency".into(),
            purpose: "Others".into(),
            other_purpose: Some("medical assistance".into()),
            amount_centavos: 125_000,
            format: Some("standard".into()),
            proof_s3_key: "proofs/x/receipt.png".into(),
            proof_content_type: Some("image/png".into()),
            status: STATUS_APPROVED.into(),
            issue_on: NaiveDate::from_ymd_opt(2026, 10, 21),
            affiant: Some("Jose Rizal".into()),
            cert_link: None,
            decline_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn official(name: &str, position: &str, order: i32) -> Official {
        Official {
            id: Uuid::new_v4(),
            name: name.into(),
            position: position.into(),
            display_order: order,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    fn settings() -> BarangaySettings {
        BarangaySettings {
            barangay_name: "San Isidro".into(),
            municipality: "Tanay".into(),
            province: "Rizal".into(),
            ..BarangaySettings::default()
        }
    }

    #[test]
    fn composes_approved_certificate() {
        let officials = vec![
            official("Pedro Santos", "kagawad", 2),
            official("Ana Reyes", POSITION_CAPTAIN, 1),
        ];
        let view = compose(&approved_request(), &settings(), &officials).unwrap();

        assert_eq!(view.title, "Certificate of Indigency");
        assert_eq!(view.purpose, "medical assistance");
        assert_eq!(view.issued_on_text, "21st day of October, 2026");
        assert_eq!(view.fee_text, "₱1,250.00");
        assert_eq!(view.header.barangay, "Barangay San Isidro");
        assert!(view.body[1].contains("MARIA DELA CRUZ"));
        assert!(view.body[1].contains("Barangay San Isidro, Tanay, Rizal"));

        let signatory = view.signatory.unwrap();
        assert_eq!(signatory.name, "Ana Reyes");
        assert_eq!(signatory.position, "Punong Barangay");
        assert_eq!(view.officials.len(), 2);
    }

    #[test]
    fn pending_requests_are_not_rendered() {
        let mut request = approved_request();
        request.status = "pending".into();
        assert_eq!(
            compose(&request, &settings(), &[]).unwrap_err(),
            CertificateError::NotIssued
        );

        let mut request = approved_request();
        request.issue_on = None;
        assert!(compose(&request, &settings(), &[]).is_err());
    }

    #[test]
    fn titles_for_unknown_types_are_title_cased() {
        assert_eq!(certificate_title("Barangay-Clearance"), "Barangay Clearance");
        assert_eq!(
            certificate_title("certificate_of_first_time_jobseeker"),
            "Certificate of First Time Jobseeker"
        );
    }

    #[test]
    fn ordinal_days() {
        let day = |d| long_date(NaiveDate::from_ymd_opt(2026, 1, d).unwrap());
        assert_eq!(day(1), "1st day of January, 2026");
        assert_eq!(day(2), "2nd day of January, 2026");
        assert_eq!(day(3), "3rd day of January, 2026");
        assert_eq!(day(11), "11th day of January, 2026");
        assert_eq!(day(12), "12th day of January, 2026");
        assert_eq!(day(22), "22nd day of January, 2026");
    }

    #[test]
    fn peso_formatting() {
        assert_eq!(peso(0), "₱0.00");
        assert_eq!(peso(5_000), "₱50.00");
        assert_eq!(peso(123_456_789), "₱1,234,567.89");
    }
}
