use serde_json::Value;

/// A PATCH field as sent: left out, explicitly `null`, or a string.
pub enum NullableValue {
    Omitted,
    Null,
    String(String),
}

pub fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => Ok(NullableValue::String(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn distinguishes_omitted_from_null() {
        let body = json!({ "sitio": null, "contact_number": "0917", "full_name": 3 });
        assert!(matches!(
            classify_nullable(body.get("missing")),
            Ok(NullableValue::Omitted)
        ));
        assert!(matches!(
            classify_nullable(body.get("sitio")),
            Ok(NullableValue::Null)
        ));
        assert!(matches!(
            classify_nullable(body.get("contact_number")),
            Ok(NullableValue::String(value)) if value == "0917"
        ));
        assert!(classify_nullable(body.get("full_name")).is_err());
    }
}
