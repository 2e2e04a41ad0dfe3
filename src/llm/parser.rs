use serde::Deserialize;
use serde_json::{Map, Value};

use super::LlmError;

/// Locate and parse the JSON object in a model reply.
///
/// A fenced ```json block wins; otherwise the outermost `{...}` span is used.
pub fn extract_json_object(response: &str) -> Result<Map<String, Value>, LlmError> {
    let candidate = fenced_block(response).unwrap_or(response);

    let start = candidate
        .find('{')
        .ok_or_else(|| LlmError::MalformedResponse("No JSON object found".into()))?;
    let end = candidate
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| LlmError::MalformedResponse("Unclosed JSON object".into()))?;

    match serde_json::from_str::<Value>(&candidate[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(LlmError::MalformedResponse("Top-level JSON is not an object".into())),
        Err(e) => Err(LlmError::MalformedResponse(format!("Invalid JSON: {e}"))),
    }
}

fn fenced_block(response: &str) -> Option<&str> {
    let open = response.find("```json")? + 7;
    let close = response[open..].find("```")?;
    Some(response[open..open + close].trim())
}

/// Parse an array leniently, skipping items that fail to deserialize.
pub fn parse_array_lenient<T: for<'de> Deserialize<'de>>(value: Option<&Value>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
        _ => vec![],
    }
}

/// Non-blank string field, trimmed.
pub fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric field; accepts numbers and strings such as `"$12,500.00"`.
pub fn number_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(lenient_number)
}

pub fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_plain_object() {
        let map = extract_json_object(r#"{"title": "Laptops"}"#).unwrap();
        assert_eq!(map["title"], "Laptops");
    }

    #[test]
    fn prefers_fenced_block() {
        let reply = "Sure {not this}\n```json\n{\"a\": 1}\n```\ntrailing {junk}";
        let map = extract_json_object(reply).unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn finds_object_in_prose() {
        let reply = "Here you go: {\"nested\": {\"x\": [1, 2]}} hope this helps";
        let map = extract_json_object(reply).unwrap();
        assert_eq!(map["nested"]["x"][1], 2);
    }

    #[test]
    fn rejects_missing_or_invalid_object() {
        assert!(matches!(
            extract_json_object("no json here"),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_json_object("{ broken: }"),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_json_object("} {"),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[test]
    fn lenient_array_skips_bad_items() {
        #[derive(Deserialize)]
        struct Item {
            name: String,
        }
        let value = json!([{"name": "a"}, {"nope": true}, {"name": "b"}]);
        let items: Vec<Item> = parse_array_lenient(Some(&value));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "b");
        assert!(parse_array_lenient::<Item>(Some(&json!("x"))).is_empty());
        assert!(parse_array_lenient::<Item>(None).is_empty());
    }

    #[test]
    fn numbers_accept_currency_strings() {
        assert_eq!(lenient_number(&json!(42)), Some(42.0));
        assert_eq!(lenient_number(&json!("$12,500.50")), Some(12500.5));
        assert_eq!(lenient_number(&json!("n/a")), None);
        assert_eq!(lenient_number(&json!(null)), None);
    }

    #[test]
    fn text_field_trims_and_skips_blank() {
        let map = json!({"a": "  hi ", "b": "   ", "c": 3, "d": null});
        let map = map.as_object().unwrap();
        assert_eq!(text_field(map, "a").as_deref(), Some("hi"));
        assert_eq!(text_field(map, "b"), None);
        assert_eq!(text_field(map, "c").as_deref(), Some("3"));
        assert_eq!(text_field(map, "d"), None);
    }
}
