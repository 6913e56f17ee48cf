use std::fmt;

use serde::{
    ser::{Error as _, SerializeMap},
    Deserialize, Serialize, Serializer,
};
use serde_json::Value;

use crate::error::{JsondsError, Result};
use crate::models::{KeyType, TagKey, TagValue};
use crate::protocol::request::Annotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Search,
    TimeSeries,
    Table,
    Annotation,
    TagKeys,
    TagValues,
    Multi,
    Invalid,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Search => "search",
            ResponseKind::TimeSeries => "timeseries",
            ResponseKind::Table => "table",
            ResponseKind::Annotation => "annotation",
            ResponseKind::TagKeys => "tagkeys",
            ResponseKind::TagValues => "tagvalues",
            ResponseKind::Multi => "multi",
            ResponseKind::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric value at a unix timestamp in milliseconds, sent as `[value, ts]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "(f64, i64)")]
pub struct Datapoint {
    pub value: f64,
    pub timestamp_ms: i64,
}

impl Datapoint {
    pub fn new(value: f64, timestamp_ms: i64) -> Self {
        Self { value, timestamp_ms }
    }
}

impl From<(f64, i64)> for Datapoint {
    fn from((value, timestamp_ms): (f64, i64)) -> Self {
        Self { value, timestamp_ms }
    }
}

/// NaN and infinities have no JSON form and fail the encode.
impl Serialize for Datapoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if !self.value.is_finite() {
            return Err(S::Error::custom(format!(
                "datapoint value {} at {} is not a finite number",
                self.value, self.timestamp_ms
            )));
        }
        (self.value, self.timestamp_ms).serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesData {
    pub target: String,
    pub datapoints: Vec<Datapoint>,
}

impl TimeSeriesData {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            datapoints: Vec::new(),
        }
    }

    pub fn push(&mut self, value: f64, timestamp_ms: i64) {
        self.datapoints.push(Datapoint::new(value, timestamp_ms));
    }
}

/// One table of a table-format query result.
///
/// Equality compares the wire fields only; the declared column count is a
/// construction-time bound and is rebuilt from the data on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawTableData")]
pub struct TableData {
    pub columns: Vec<TagKey>,
    pub rows: Vec<Vec<Value>>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip)]
    column_count: usize,
}

#[derive(Deserialize)]
struct RawTableData {
    #[serde(default)]
    columns: Vec<TagKey>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
    #[serde(rename = "type", default = "table_kind")]
    kind: String,
}

fn table_kind() -> String {
    "table".to_string()
}

impl From<RawTableData> for TableData {
    fn from(raw: RawTableData) -> Self {
        let row_width = raw.rows.first().map(Vec::len).unwrap_or(0);
        Self {
            column_count: raw.columns.len().max(row_width),
            columns: raw.columns,
            rows: raw.rows,
            kind: raw.kind,
        }
    }
}

impl PartialEq for TableData {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.rows == other.rows && self.kind == other.kind
    }
}

impl TableData {
    /// Creates an empty table that will hold `column_count` columns.
    pub fn new(column_count: usize) -> Self {
        Self {
            columns: Vec::with_capacity(column_count),
            rows: Vec::new(),
            kind: table_kind(),
            column_count,
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn insert_column(&mut self, text: impl Into<String>, kind: KeyType) {
        self.columns.push(TagKey::new(text, kind));
    }

    /// Appends a row in column order; its length must equal the column count.
    pub fn insert_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.column_count {
            return Err(JsondsError::RowSize {
                expected: self.column_count,
                got: values.len(),
            });
        }
        self.rows.push(values);
        Ok(())
    }
}

/// A single annotation event rendered on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEvent {
    pub annotation: Annotation,
    /// Milliseconds since the unix epoch.
    pub time: i64,
    pub title: String,
    pub tags: String,
    pub text: String,
}

/// Time series and table results produced by the same query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiResponse {
    pub timeseries: Vec<TimeSeriesData>,
    pub table: Vec<TableData>,
}

impl MultiResponse {
    /// Serializes both halves independently, leaving the combination to the caller.
    pub fn encode_parts(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let timeseries = to_pretty(&self.timeseries)?;
        let table = to_pretty(&self.table)?;
        Ok((timeseries, table))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Search(Vec<String>),
    TimeSeries(Vec<TimeSeriesData>),
    Table(Vec<TableData>),
    Annotations(Vec<AnnotationEvent>),
    TagKeys(Vec<TagKey>),
    TagValues(Vec<TagValue>),
    Multi(MultiResponse),
    /// Returned when a handler has nothing meaningful to answer with.
    Invalid,
}

impl Response {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::Search(_) => ResponseKind::Search,
            Response::TimeSeries(_) => ResponseKind::TimeSeries,
            Response::Table(_) => ResponseKind::Table,
            Response::Annotations(_) => ResponseKind::Annotation,
            Response::TagKeys(_) => ResponseKind::TagKeys,
            Response::TagValues(_) => ResponseKind::TagValues,
            Response::Multi(_) => ResponseKind::Multi,
            Response::Invalid => ResponseKind::Invalid,
        }
    }

    /// Pretty-printed JSON for the wire. `Invalid` has no valid encoding and
    /// always fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Response::Invalid => Err(JsondsError::InvalidResponse),
            _ => to_pretty(self),
        }
    }

    /// JSON body regardless of validity; `Invalid` renders as `{}`.
    pub fn body(&self) -> Vec<u8> {
        match self {
            Response::Invalid => b"{}".to_vec(),
            _ => serde_json::to_vec(self).unwrap_or_else(|_| b"{}".to_vec()),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Response::Search(names) => names.serialize(serializer),
            Response::TimeSeries(series) => series.serialize(serializer),
            Response::Table(tables) => tables.serialize(serializer),
            Response::Annotations(events) => events.serialize(serializer),
            Response::TagKeys(keys) => keys.serialize(serializer),
            Response::TagValues(values) => values.serialize(serializer),
            Response::Multi(multi) => multi.serialize(serializer),
            Response::Invalid => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

fn to_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| JsondsError::Encode(e.to_string()))
}
