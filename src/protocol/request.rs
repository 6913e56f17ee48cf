use std::collections::BTreeMap;
use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JsondsError, Result};
use crate::models::{null_as_default, AdhocFilter, Range, ScopedPair, ScopedVars, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Search,
    Query,
    Annotation,
    TagKeys,
    TagValues,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Search => "search",
            RequestKind::Query => "query",
            RequestKind::Annotation => "annotation",
            RequestKind::TagKeys => "tagkeys",
            RequestKind::TagValues => "tagvalues",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `/search`: the text typed into the metric picker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub target: String,
}

/// Body of `/query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub range: Range,
    #[serde(deserialize_with = "null_as_default")]
    pub interval: String,
    #[serde(deserialize_with = "null_as_default")]
    pub interval_ms: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub targets: Vec<Target>,
    #[serde(deserialize_with = "null_as_default")]
    pub adhoc_filters: Vec<AdhocFilter>,
    #[serde(deserialize_with = "null_as_default")]
    pub format: String,
    #[serde(deserialize_with = "null_as_default")]
    pub max_data_points: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub scoped_vars: ScopedVars,
}

impl QueryRequest {
    pub fn global_var(&self, name: &str) -> Option<&ScopedPair> {
        self.scoped_vars.get(name)
    }

    pub fn global_var_names(&self) -> Vec<&str> {
        self.scoped_vars.keys().map(String::as_str).collect()
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.target.as_str()).collect()
    }
}

/// Annotation descriptor configured on the dashboard. The `name` must be
/// echoed back unchanged in every returned event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Annotation {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub datasource: String,
    #[serde(deserialize_with = "null_as_default")]
    pub icon_color: String,
    #[serde(deserialize_with = "null_as_default")]
    pub enable: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub show_line: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub query: String,
}

/// Body of `/annotations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationsRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub range: Range,
    #[serde(deserialize_with = "null_as_default")]
    pub annotation: Annotation,
}

/// Body of `/tag-keys`; Grafana sends an object whose contents are not fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagKeysRequest(pub BTreeMap<String, Value>);

/// Body of `/tag-values`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagValuesRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
}

/// A decoded request. Lives for one HTTP call and is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Search(SearchRequest),
    Query(QueryRequest),
    Annotations(AnnotationsRequest),
    TagKeys(TagKeysRequest),
    TagValues(TagValuesRequest),
}

impl Request {
    /// Decodes `body` into the variant selected by `kind`.
    pub fn decode(kind: RequestKind, body: &[u8]) -> Result<Self> {
        let request = match kind {
            RequestKind::Search => Request::Search(parse(body)?),
            RequestKind::Query => Request::Query(parse(body)?),
            RequestKind::Annotation => Request::Annotations(parse(body)?),
            RequestKind::TagKeys => Request::TagKeys(parse(body)?),
            RequestKind::TagValues => Request::TagValues(parse(body)?),
        };
        Ok(request)
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Search(_) => RequestKind::Search,
            Request::Query(_) => RequestKind::Query,
            Request::Annotations(_) => RequestKind::Annotation,
            Request::TagKeys(_) => RequestKind::TagKeys,
            Request::TagValues(_) => RequestKind::TagValues,
        }
    }

    pub fn as_search(&self) -> Option<&SearchRequest> {
        match self {
            Request::Search(req) => Some(req),
            _ => None,
        }
    }

    pub fn as_query(&self) -> Option<&QueryRequest> {
        match self {
            Request::Query(req) => Some(req),
            _ => None,
        }
    }

    pub fn as_annotations(&self) -> Option<&AnnotationsRequest> {
        match self {
            Request::Annotations(req) => Some(req),
            _ => None,
        }
    }

    pub fn as_tag_keys(&self) -> Option<&TagKeysRequest> {
        match self {
            Request::TagKeys(req) => Some(req),
            _ => None,
        }
    }

    pub fn as_tag_values(&self) -> Option<&TagValuesRequest> {
        match self {
            Request::TagValues(req) => Some(req),
            _ => None,
        }
    }
}

/// A `null` body decodes to the default request.
fn parse<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    serde_json::from_slice::<Option<T>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| JsondsError::Decode(e.to_string()))
}
