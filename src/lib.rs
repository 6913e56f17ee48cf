//! Backend adapter for the Grafana simple JSON datasource protocol.
//!
//! Register handlers on a [`RegistryBuilder`], freeze it with
//! [`RegistryBuilder::configure`], and serve it with [`api::serve`].

pub mod api;
pub mod coerce;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod protocol;
pub mod registry;

pub use coerce::to_string_array;
pub use config::Config;
pub use error::{JsondsError, Result};
pub use protocol::{Request, RequestKind, Response, ResponseKind};
pub use registry::{BackendHandler, Endpoint, Registry, RegistryBuilder};
