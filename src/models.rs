use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::coerce::to_string_array;

/// Reads an explicit JSON `null` as the field's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Time range a request is valid for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Range {
    #[serde(deserialize_with = "null_as_default")]
    pub from: DateTime<Utc>,
    #[serde(deserialize_with = "null_as_default")]
    pub to: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawRange>,
}

/// Relative expressions as typed in the dashboard, e.g. `now-6h`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRange {
    #[serde(deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(deserialize_with = "null_as_default")]
    pub to: String,
}

impl Range {
    pub fn from_ms(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_ms(&self) -> i64 {
        self.to.timestamp_millis()
    }
}

/// A single query target and its free-form payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    #[serde(deserialize_with = "null_as_default")]
    pub target: String,
    #[serde(
        rename = "refId",
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub ref_id: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data: BTreeMap<String, Value>,
}

impl Target {
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn var_names(&self) -> Vec<&str> {
        self.data.keys().map(String::as_str).collect()
    }

    /// Coerced values of a data variable; empty when the variable is absent.
    pub fn var_values(&self, name: &str) -> Vec<String> {
        self.var(name).map(to_string_array).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdhocFilter {
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub operator: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

/// Text/value pair of a dashboard template variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopedPair {
    pub text: Value,
    pub value: Value,
}

impl ScopedPair {
    pub fn values(&self) -> Vec<String> {
        to_string_array(&self.value)
    }

    pub fn texts(&self) -> Vec<String> {
        to_string_array(&self.text)
    }
}

pub type ScopedVars = BTreeMap<String, ScopedPair>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    String,
    Number,
    Time,
}

impl KeyType {
    pub const ALL: [KeyType; 3] = [KeyType::String, KeyType::Number, KeyType::Time];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::String => "string",
            KeyType::Number => "number",
            KeyType::Time => "time",
        }
    }
}

/// Column or ad hoc filter key description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagKey {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl TagKey {
    pub fn new(text: impl Into<String>, kind: KeyType) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagValue {
    pub text: String,
}

impl TagValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_decodes_rfc3339() {
        let range: Range = serde_json::from_value(json!({
            "from": "2016-10-31T06:33:44.866Z",
            "to": "2016-10-31T12:33:44.866Z",
            "raw": {"from": "now-6h", "to": "now"}
        }))
        .unwrap();
        assert_eq!(range.from_ms(), 1_477_895_624_866);
        assert_eq!(range.to_ms() - range.from_ms(), 6 * 3600 * 1000);
        assert_eq!(range.raw.unwrap().from, "now-6h");
    }

    #[test]
    fn test_target_vars() {
        let target: Target = serde_json::from_value(json!({
            "target": "cpu",
            "refId": "A",
            "type": "timeserie",
            "data": {"hosts": "{a,b}", "limit": 10}
        }))
        .unwrap();
        assert_eq!(target.var_names(), vec!["hosts", "limit"]);
        assert_eq!(target.var_values("hosts"), vec!["a", "b"]);
        assert_eq!(target.var_values("limit"), vec!["10"]);
        assert!(target.var_values("missing").is_empty());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let target: Target = serde_json::from_value(json!({
            "target": "cpu",
            "refId": null,
            "type": null,
            "data": null
        }))
        .unwrap();
        assert_eq!(target.target, "cpu");
        assert!(target.ref_id.is_empty());
        assert!(target.data.is_empty());

        let range: Range = serde_json::from_value(json!({
            "from": null,
            "to": "2016-10-31T06:33:44.866Z",
            "raw": {"from": null, "to": "now"}
        }))
        .unwrap();
        assert_eq!(range.from_ms(), 0);
        assert_eq!(range.raw.unwrap().to, "now");

        let filter: AdhocFilter =
            serde_json::from_value(json!({"key": "City", "operator": null, "value": null})).unwrap();
        assert_eq!(filter.key, "City");
        assert!(filter.operator.is_empty());
    }

    #[test]
    fn test_scoped_pair_coercion() {
        let pair: ScopedPair = serde_json::from_value(json!({
            "text": "a + b",
            "value": ["a", "b"]
        }))
        .unwrap();
        assert_eq!(pair.values(), vec!["a", "b"]);
        assert_eq!(pair.texts(), vec!["a + b"]);
    }

    #[test]
    fn test_tag_key_wire_shape() {
        let key = TagKey::new("City", KeyType::String);
        assert_eq!(
            serde_json::to_value(&key).unwrap(),
            json!({"type": "string", "text": "City"})
        );
    }
}
