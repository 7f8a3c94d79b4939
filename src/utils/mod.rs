use chrono::{DateTime, NaiveDateTime, Utc};

pub mod json;

pub fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

/// Rejects values longer than `max` characters with a message naming the field.
pub fn check_max_chars(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        assert!(check_max_chars("sitio", &"ñ".repeat(100), 100).is_ok());
        assert_eq!(
            check_max_chars("sitio", &"a".repeat(101), 100).unwrap_err(),
            "sitio must be at most 100 characters"
        );
    }
}
