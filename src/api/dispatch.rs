//! Per-call request handling: decode, invoke, encode.
//!
//! [`dispatch`] knows nothing about sockets; the axum routes in
//! [`super::server`] feed it the method and raw body of each call.

use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
};
use bytes::Bytes;
use tracing::{debug, error};

use crate::{
    error::{JsondsError, Result},
    metrics::{record_request, RequestTimer},
    protocol::Request,
    registry::{Endpoint, Registry},
};

/// Status and pretty-printed JSON body for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Reply {
    fn ok(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn from_error(err: &JsondsError) -> Self {
        Self {
            status: err.status_code(),
            body: err.envelope(),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> HttpResponse {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// Handles one call to a non-root endpoint.
///
/// Only `POST` is accepted. The handler is not invoked when the method is
/// wrong or the body does not decode.
pub fn dispatch(registry: &Registry, endpoint: Endpoint, method: &Method, body: &[u8]) -> Reply {
    let _timer = RequestTimer::new(endpoint);
    debug!(endpoint = %endpoint, method = %method, "endpoint called");

    let reply = match handle(registry, endpoint, method, body) {
        Ok(bytes) => Reply::ok(bytes),
        Err(err) => {
            error!(endpoint = %endpoint, error = %err, "request failed");
            Reply::from_error(&err)
        }
    };

    record_request(endpoint, reply.status.as_u16());
    reply
}

fn handle(registry: &Registry, endpoint: Endpoint, method: &Method, body: &[u8]) -> Result<Vec<u8>> {
    if *method != Method::POST {
        return Err(JsondsError::MethodNotAllowed(method.to_string()));
    }

    let kind = endpoint
        .request_kind()
        .ok_or(JsondsError::Unhandled(endpoint))?;
    let request = Request::decode(kind, body)?;
    let response = registry.invoke(endpoint, &request)?;

    response
        .encode()
        .map_err(|e| JsondsError::Encode(e.to_string()))
}

/// Runs [`dispatch`] on the blocking pool so slow handlers do not stall the
/// runtime.
pub async fn dispatch_blocking(
    registry: Arc<Registry>,
    endpoint: Endpoint,
    method: Method,
    body: Bytes,
) -> Reply {
    let task = tokio::task::spawn_blocking(move || dispatch(&registry, endpoint, &method, &body));
    match task.await {
        Ok(reply) => reply,
        Err(e) => {
            error!(endpoint = %endpoint, error = %e, "handler task failed");
            let err = JsondsError::Internal(format!("handler task failed: {}", e));
            record_request(endpoint, err.status_code().as_u16());
            Reply::from_error(&err)
        }
    }
}
