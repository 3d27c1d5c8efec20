//! Sensitive-field redaction for log lines
//!
//! Every insurer API call is logged with its parameter set; personal
//! identifiers are masked before the record is built, recursively
//! through nested objects and arrays, so no call site can leak them.

use serde_json::Value;

/// Fields replaced by [`MASK`] wherever they appear (key match is
/// case-insensitive)
const SENSITIVE_FIELDS: [&str; 5] = ["numtel", "email", "numident", "telephone", "numero_piece"];

/// Fixed replacement string
pub const MASK: &str = "*****";

/// Return a copy of `value` with every sensitive field masked.
pub fn mask_sensitive(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let lower = k.to_lowercase();
                    if SENSITIVE_FIELDS.contains(&lower.as_str()) {
                        (k.clone(), Value::String(MASK.to_string()))
                    } else {
                        (k.clone(), mask_sensitive(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask_sensitive).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_masks_top_level_fields() {
        let masked = mask_sensitive(&json!({
            "nom": "Diop",
            "numtel": "771234567",
            "Email": "a@b.sn",
        }));
        assert_eq!(masked["nom"], "Diop");
        assert_eq!(masked["numtel"], MASK);
        assert_eq!(masked["Email"], MASK);
    }

    #[test]
    fn test_masks_nested_objects_and_lists() {
        let masked = mask_sensitive(&json!({
            "client": { "numident": "SN123", "adresse": "Dakar" },
            "contacts": [
                { "telephone": "770000000" },
                { "telephone": "780000000" },
            ],
        }));
        assert_eq!(masked["client"]["numident"], MASK);
        assert_eq!(masked["client"]["adresse"], "Dakar");
        assert_eq!(masked["contacts"][0]["telephone"], MASK);
        assert_eq!(masked["contacts"][1]["telephone"], MASK);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(mask_sensitive(&json!(42)), json!(42));
        assert_eq!(mask_sensitive(&json!("x")), json!("x"));
    }
}
