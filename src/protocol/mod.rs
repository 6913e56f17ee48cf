//! Closed request and response sets of the Grafana JSON datasource protocol.
//!
//! Both are plain enums: handlers match on the variant instead of probing a
//! set of accessors, and every variant knows its kind tag and JSON shape.

pub mod request;
pub mod response;

pub use request::{
    Annotation, AnnotationsRequest, QueryRequest, Request, RequestKind, SearchRequest,
    TagKeysRequest, TagValuesRequest,
};
pub use response::{
    AnnotationEvent, Datapoint, MultiResponse, Response, ResponseKind, TableData, TimeSeriesData,
};
