//! Normalizes template-variable values into flat string sequences.
//!
//! Grafana sends a single selection as a scalar or a one-element string and a
//! multi-selection either as a brace-wrapped comma list (`"{a,b}"`) or as a
//! JSON array, sometimes nested. Handlers building queries want `Vec<String>`.

use serde_json::Value;

/// Scalar kinds resolved once when a value enters the worklist.
#[derive(Debug, Clone, Copy)]
enum Scalar<'a> {
    Text(&'a str),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
}

impl Scalar<'_> {
    fn render(self) -> String {
        match self {
            Scalar::Text(s) => s.to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Uint(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Entry<'a> {
    Scalar(Scalar<'a>),
    Seq(&'a [Value]),
    Skip,
}

impl<'a> Entry<'a> {
    fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(s) => Entry::Scalar(Scalar::Text(s)),
            Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => Entry::Scalar(Scalar::Int(i)),
                (None, Some(u), _) => Entry::Scalar(Scalar::Uint(u)),
                (None, None, Some(f)) => Entry::Scalar(Scalar::Float(f)),
                _ => Entry::Skip,
            },
            Value::Bool(b) => Entry::Scalar(Scalar::Bool(*b)),
            Value::Array(items) => Entry::Seq(items),
            Value::Null | Value::Object(_) => Entry::Skip,
        }
    }

    fn is_seq(&self) -> bool {
        matches!(self, Entry::Seq(_))
    }
}

/// Converts a loosely typed variable value into an ordered list of strings.
///
/// Arrays are flattened level by level until no nested array remains; order is
/// preserved and duplicates are kept. A string wrapped in `{}` or `[]` is split
/// on commas (embedded commas cannot be escaped). Values with no sensible
/// string form yield an empty list.
pub fn to_string_array(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => flatten(items),
        Value::String(s) => split_delimited(s),
        Value::Number(_) => match Entry::classify(value) {
            Entry::Scalar(scalar) => vec![scalar.render()],
            _ => Vec::new(),
        },
        Value::Bool(_) | Value::Null | Value::Object(_) => Vec::new(),
    }
}

fn flatten(items: &[Value]) -> Vec<String> {
    if let Some(strings) = all_strings(items) {
        return strings;
    }

    let mut pending: Vec<Entry<'_>> = items.iter().map(Entry::classify).collect();
    while pending.iter().any(Entry::is_seq) {
        let mut next = Vec::with_capacity(pending.len());
        for entry in pending {
            match entry {
                Entry::Seq(inner) => next.extend(inner.iter().map(Entry::classify)),
                other => next.push(other),
            }
        }
        pending = next;
    }

    pending
        .into_iter()
        .filter_map(|entry| match entry {
            Entry::Scalar(scalar) => Some(scalar.render()),
            _ => None,
        })
        .collect()
}

fn all_strings(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn split_delimited(s: &str) -> Vec<String> {
    let inner = s
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| s.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')));

    match inner {
        Some("") => Vec::new(),
        Some(list) => list.split(',').map(str::to_string).collect(),
        None => vec![s.to_string()],
    }
}
