//! Sample backend served by the `jsonds` binary.
//!
//! Answers every endpoint from the `[demo]` config table so a dashboard can be
//! pointed at the server without writing any handler code.

use std::sync::Arc;

use serde_json::json;

use crate::{
    config::DemoConfig,
    error::{JsondsError, Result},
    models::{KeyType, TagKey, TagValue},
    protocol::{AnnotationEvent, QueryRequest, Request, Response, TableData, TimeSeriesData},
    registry::{Endpoint, RegistryBuilder},
};

const TARGET_KEY: &str = "target";
const DEFAULT_STEP_MS: i64 = 60_000;

/// Registers the demo handlers under the default paths. Path overrides from
/// the configuration are applied afterwards with
/// [`RegistryBuilder::apply_paths`].
pub fn register(builder: RegistryBuilder, config: &DemoConfig) -> RegistryBuilder {
    let demo = Arc::new(config.clone());

    let search = demo.clone();
    let query = demo.clone();
    let values = demo;

    builder
        .set_search(Endpoint::Search.default_path(), move |req| {
            search_targets(&search, req)
        })
        .set_query(Endpoint::Query.default_path(), move |req| run_query(&query, req))
        .set_annotations(Endpoint::Annotations.default_path(), annotate)
        .set_tag_keys(Endpoint::TagKeys.default_path(), |_| {
            Ok(Response::TagKeys(vec![TagKey::new(TARGET_KEY, KeyType::String)]))
        })
        .set_tag_values(Endpoint::TagValues.default_path(), move |req| {
            tag_values(&values, req)
        })
}

fn search_targets(config: &DemoConfig, req: &Request) -> Result<Response> {
    let needle = req.as_search().map(|s| s.target.as_str()).unwrap_or_default();
    let names = config
        .targets
        .iter()
        .filter(|name| name.contains(needle))
        .cloned()
        .collect();
    Ok(Response::Search(names))
}

fn run_query(config: &DemoConfig, req: &Request) -> Result<Response> {
    let query = req
        .as_query()
        .ok_or_else(|| JsondsError::handler("expected a query request"))?;

    for name in query.target_names() {
        if !config.targets.iter().any(|t| t == name) {
            return Err(JsondsError::handler(format!("unknown target {}", name)));
        }
    }

    let timestamps = timestamps(query);
    if query.targets.iter().any(|t| t.kind == "table") {
        let mut table = TableData::new(3);
        table.insert_column("Time", KeyType::Time);
        table.insert_column("Target", KeyType::String);
        table.insert_column("Value", KeyType::Number);
        for target in &query.targets {
            for &ts in &timestamps {
                table.insert_row(vec![json!(ts), json!(target.target), json!(config.value)])?;
            }
        }
        return Ok(Response::Table(vec![table]));
    }

    let series = query
        .targets
        .iter()
        .map(|target| {
            let mut data = TimeSeriesData::new(target.target.clone());
            for &ts in &timestamps {
                data.push(config.value, ts);
            }
            data
        })
        .collect();
    Ok(Response::TimeSeries(series))
}

/// Evenly spaced timestamps across the requested range, capped at
/// `maxDataPoints` when the dashboard sends one.
fn timestamps(query: &QueryRequest) -> Vec<i64> {
    let (from, to) = (query.range.from_ms(), query.range.to_ms());
    if to < from {
        return Vec::new();
    }

    let step = if query.interval_ms > 0 {
        query.interval_ms
    } else {
        DEFAULT_STEP_MS
    };
    let limit = usize::try_from(query.max_data_points)
        .ok()
        .filter(|&n| n > 0)
        .unwrap_or(usize::MAX);

    (0..)
        .map(|i| from + i * step)
        .take_while(|&ts| ts <= to)
        .take(limit)
        .collect()
}

fn annotate(req: &Request) -> Result<Response> {
    let anno = req
        .as_annotations()
        .ok_or_else(|| JsondsError::handler("expected an annotations request"))?;
    Ok(Response::Annotations(vec![AnnotationEvent {
        annotation: anno.annotation.clone(),
        time: anno.range.from_ms(),
        title: anno.annotation.name.clone(),
        tags: anno.annotation.query.clone(),
        text: "range start".to_string(),
    }]))
}

fn tag_values(config: &DemoConfig, req: &Request) -> Result<Response> {
    let key = req.as_tag_values().map(|r| r.key.as_str()).unwrap_or_default();
    let values = if key == TARGET_KEY {
        config.targets.iter().map(TagValue::new).collect()
    } else {
        Vec::new()
    };
    Ok(Response::TagValues(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Range, Target};
    use crate::protocol::{SearchRequest, TagValuesRequest};
    use chrono::{TimeZone, Utc};

    fn config() -> DemoConfig {
        DemoConfig {
            targets: vec!["cpu".into(), "cpu_idle".into(), "mem".into()],
            value: 2.5,
        }
    }

    fn query(kind: &str, max_data_points: i64) -> Request {
        Request::Query(QueryRequest {
            range: Range {
                from: Utc.timestamp_millis_opt(0).unwrap(),
                to: Utc.timestamp_millis_opt(300_000).unwrap(),
                raw: None,
            },
            interval_ms: 60_000,
            max_data_points,
            targets: vec![Target {
                target: "cpu".into(),
                kind: kind.into(),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    #[test]
    fn test_search_filters_targets() {
        let req = Request::Search(SearchRequest { target: "cpu".into() });
        let resp = search_targets(&config(), &req).unwrap();
        assert_eq!(resp, Response::Search(vec!["cpu".into(), "cpu_idle".into()]));
    }

    #[test]
    fn test_query_timeseries() {
        let resp = run_query(&config(), &query("timeserie", 0)).unwrap();
        let Response::TimeSeries(series) = resp else {
            panic!("expected time series");
        };
        assert_eq!(series[0].target, "cpu");
        assert_eq!(series[0].datapoints.len(), 6);
        assert_eq!(series[0].datapoints[5].timestamp_ms, 300_000);
        assert_eq!(series[0].datapoints[0].value, 2.5);
    }

    #[test]
    fn test_query_respects_max_data_points() {
        let resp = run_query(&config(), &query("timeserie", 2)).unwrap();
        let Response::TimeSeries(series) = resp else {
            panic!("expected time series");
        };
        assert_eq!(series[0].datapoints.len(), 2);
    }

    #[test]
    fn test_query_table() {
        let resp = run_query(&config(), &query("table", 0)).unwrap();
        let Response::Table(tables) = resp else {
            panic!("expected table");
        };
        assert_eq!(tables[0].columns.len(), 3);
        assert_eq!(tables[0].rows.len(), 6);
    }

    #[test]
    fn test_unknown_target_is_handler_error() {
        let mut req = query("timeserie", 0);
        if let Request::Query(q) = &mut req {
            q.targets[0].target = "disk".into();
        }
        let err = run_query(&config(), &req).unwrap_err();
        assert_eq!(err.to_string(), "unknown target disk");
    }

    #[test]
    fn test_tag_values() {
        let req = Request::TagValues(TagValuesRequest { key: "target".into() });
        let Response::TagValues(values) = tag_values(&config(), &req).unwrap() else {
            panic!("expected tag values");
        };
        assert_eq!(values.len(), 3);

        let req = Request::TagValues(TagValuesRequest { key: "other".into() });
        assert_eq!(tag_values(&config(), &req).unwrap(), Response::TagValues(vec![]));
    }
}
