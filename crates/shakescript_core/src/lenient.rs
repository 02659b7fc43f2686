//! Forgiving deserializers for model-produced JSON.
//!
//! Model output routinely puts numbers where strings belong or emits a
//! list where an object was asked for. These helpers accept the shape we
//! asked for and degrade everything else to an empty value.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Object of anything → map of strings; any other shape → empty map.
pub(crate) fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), value_to_text(v)))
            .collect(),
        _ => BTreeMap::new(),
    })
}

/// Like [`string_map`] but keeps `None` when the key is null or not an object.
pub(crate) fn optional_string_map<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => Some(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_text(v)))
                .collect(),
        ),
        _ => None,
    })
}

/// Scalar → string, null → empty.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

/// Accepts booleans and the usual yes/no spellings.
pub(crate) fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "active" => Some(true),
            "false" | "no" | "inactive" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// A list of objects where individual malformed entries are dropped.
pub(crate) fn tolerant_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Value::Object(_) => serde_json::from_value(value).map(|t| vec![t]).unwrap_or_default(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "string_map")]
        map: BTreeMap<String, String>,
        #[serde(default, deserialize_with = "optional_flag")]
        flag: Option<bool>,
    }

    #[test]
    fn string_map_stringifies_scalars() {
        let loose: Loose = serde_json::from_str(r#"{"map": {"a": 1, "b": "two"}}"#).unwrap();
        assert_eq!(loose.map.get("a").map(String::as_str), Some("1"));
        assert_eq!(loose.map.get("b").map(String::as_str), Some("two"));
    }

    #[test]
    fn string_map_drops_non_objects() {
        let loose: Loose = serde_json::from_str(r#"{"map": ["a", "b"]}"#).unwrap();
        assert!(loose.map.is_empty());
    }

    #[test]
    fn flag_accepts_words() {
        let loose: Loose = serde_json::from_str(r#"{"flag": "Yes"}"#).unwrap();
        assert_eq!(loose.flag, Some(true));
        let loose: Loose = serde_json::from_str(r#"{"flag": "maybe"}"#).unwrap();
        assert_eq!(loose.flag, None);
    }
}
