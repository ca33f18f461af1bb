use serde::Serialize;
use serde_json::Value;

use super::vehicle_api::VehicleData;

/// One labelled line of a lookup result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DisplayField {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// `"chassisNo"` -> `"Chassis No"`. All-caps keys come out letter-spaced
/// (`"OWNER"` -> `"O W N E R"`), which is what the console has always shown.
pub fn humanize_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() * 2);
    for c in key.trim().chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }

    let mut chars = spaced.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    capitalized.trim().to_string()
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".into()),
        Value::Bool(false) | Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Fields worth showing, in response order. Blank keys and empty values
/// are dropped.
pub fn render_fields(data: &VehicleData) -> Vec<DisplayField> {
    data.iter()
        .filter(|(key, _)| !key.trim().is_empty())
        .filter_map(|(key, value)| {
            display_value(value).map(|value| DisplayField {
                key: key.clone(),
                label: humanize_key(key),
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn labels() {
        assert_eq!(humanize_key("chassisNo"), "Chassis No");
        assert_eq!(humanize_key("  regDate "), "Reg Date");
        assert_eq!(humanize_key("OWNER"), "O W N E R");
        assert_eq!(humanize_key("fuel_type"), "Fuel_type");
        assert_eq!(humanize_key(""), "");
    }

    #[test]
    fn skips_blank_keys_and_empty_values() {
        let data = json!({
            "OWNER": "  A SINGH ",
            "CHASSIS": "",
            "ENGINE": "   ",
            " ": "ignored",
            "SEATS": 5,
            "CC": 0,
            "INSURED": true,
            "FINANCED": false,
            "NOC": null,
        });
        let Value::Object(data) = data else { unreachable!() };

        let fields = render_fields(&data);
        let rendered: Vec<(&str, &str)> = fields
            .iter()
            .map(|f| (f.key.as_str(), f.value.as_str()))
            .collect();

        assert_eq!(rendered.len(), 3);
        assert!(rendered.contains(&("OWNER", "A SINGH")));
        assert!(rendered.contains(&("SEATS", "5")));
        assert!(rendered.contains(&("INSURED", "true")));
    }
}
