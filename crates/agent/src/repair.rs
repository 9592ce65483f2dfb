//! Recovery of a JSON object from free-form model output, plus lenient
//! coercions for the loosely typed fields models tend to return.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

use callcart_core::revenue::clamp_confidence;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepairError {
    #[error("model returned an empty response")]
    Empty,
    #[error("no JSON object found in model response")]
    NoJsonObject,
    #[error("model response is not valid JSON: {0}")]
    Invalid(String),
    #[error("model response is not a JSON object")]
    NotAnObject,
}

/// Strips markdown fencing and parses the text between the first `{` and the last `}`.
pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, RepairError> {
    let unfenced = strip_fences(text);
    if unfenced.trim().is_empty() {
        return Err(RepairError::Empty);
    }

    let start = unfenced.find('{').ok_or(RepairError::NoJsonObject)?;
    let end = unfenced.rfind('}').ok_or(RepairError::NoJsonObject)?;
    if end < start {
        return Err(RepairError::NoJsonObject);
    }

    match serde_json::from_str::<Value>(&unfenced[start..=end]) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(RepairError::NotAnObject),
        Err(error) => Err(RepairError::Invalid(error.to_string())),
    }
}

fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// First present, non-null value among `keys`.
pub fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| object.get(*key)).find(|value| !value.is_null())
}

/// Trimmed, non-empty string.
pub fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Numbers or numeric strings (`"120"`, `"$1,200.50"`); negative values are dropped.
pub fn price(value: Option<&Value>) -> Option<Decimal> {
    let parsed = match value? {
        Value::Number(number) => number
            .as_i64()
            .map(Decimal::from)
            .or_else(|| number.as_f64().and_then(Decimal::from_f64)),
        Value::String(raw) => {
            let cleaned: String =
                raw.trim().chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }?;
    (parsed >= Decimal::ZERO).then_some(parsed)
}

/// Swaps the bounds when both are present and inverted.
pub fn price_bounds(
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> (Option<Decimal>, Option<Decimal>) {
    match (min, max) {
        (Some(min), Some(max)) if min > max => (Some(max), Some(min)),
        bounds => bounds,
    }
}

pub fn confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    clamp_confidence(raw)
}

/// Trimmed, non-empty strings of an array; anything else is an empty list.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|item| text(Some(item))).collect())
        .unwrap_or_default()
}

/// Keeps entries whose value is a non-empty trimmed string; keys are lowercased.
/// Empty results collapse to `None`.
pub fn string_map(value: Option<&Value>) -> Option<BTreeMap<String, String>> {
    let attributes: BTreeMap<String, String> = value?
        .as_object()?
        .iter()
        .filter_map(|(key, value)| {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                return None;
            }
            text(Some(value)).map(|value| (key, value))
        })
        .collect();
    (!attributes.is_empty()).then_some(attributes)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        confidence, parse_json_object, price, price_bounds, string_list, string_map, RepairError,
    };

    #[test]
    fn recovers_object_from_fenced_and_chatty_output() {
        let text = "Sure! Here is the analysis:\n```json\n{\"sentiment\": \"positive\"}\n```\nLet me know.";

        let object = parse_json_object(text).expect("repaired object");

        assert_eq!(object["sentiment"], "positive");
    }

    #[test]
    fn reports_each_failure_kind() {
        assert_eq!(parse_json_object("   "), Err(RepairError::Empty));
        assert_eq!(parse_json_object("no json here"), Err(RepairError::NoJsonObject));
        assert_eq!(parse_json_object("} backwards {"), Err(RepairError::NoJsonObject));
        assert!(matches!(parse_json_object("{\"a\": }"), Err(RepairError::Invalid(_))));
        assert!(matches!(parse_json_object("{\"a\": 1} {\"b\": 2}"), Err(RepairError::Invalid(_))));
    }

    #[test]
    fn prices_accept_numeric_strings_and_drop_negatives() {
        assert_eq!(price(Some(&json!(150))), Some(Decimal::new(150, 0)));
        assert_eq!(price(Some(&json!("$1,200.50"))), Some(Decimal::new(120050, 2)));
        assert_eq!(price(Some(&json!(-5))), None);
        assert_eq!(price(Some(&json!("cheap"))), None);
        assert_eq!(price(Some(&json!(true))), None);
        assert_eq!(price(None), None);
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let (min, max) = price_bounds(Some(Decimal::new(200, 0)), Some(Decimal::new(50, 0)));
        assert_eq!((min, max), (Some(Decimal::new(50, 0)), Some(Decimal::new(200, 0))));

        let open = price_bounds(None, Some(Decimal::new(50, 0)));
        assert_eq!(open, (None, Some(Decimal::new(50, 0))));
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(confidence(Some(&json!(1.7))), 1.0);
        assert_eq!(confidence(Some(&json!(-0.2))), 0.0);
        assert_eq!(confidence(Some(&json!("0.5"))), 0.5);
        assert_eq!(confidence(None), 0.0);
    }

    #[test]
    fn attribute_maps_keep_only_non_empty_strings() {
        let attributes = string_map(Some(&json!({"Size": " 42 ", "color": "", "width": 3})))
            .expect("attributes");
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes["size"], "42");

        assert_eq!(string_map(Some(&json!({"color": "  "}))), None);
        assert_eq!(string_list(Some(&json!(["Court King", "", 5]))), vec!["Court King"]);
    }
}
