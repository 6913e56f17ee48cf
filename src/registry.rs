//! Endpoint paths and backend handlers.
//!
//! Registration happens on a [`RegistryBuilder`]; [`RegistryBuilder::configure`]
//! freezes it into a read-only [`Registry`] that the server shares across calls.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{JsondsError, Result};
use crate::protocol::{Request, RequestKind, Response};

/// User-supplied logic answering one endpoint.
pub type BackendHandler = Arc<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Root,
    Search,
    Query,
    Annotations,
    TagKeys,
    TagValues,
}

impl Endpoint {
    pub const ALL: [Endpoint; 6] = [
        Endpoint::Root,
        Endpoint::Search,
        Endpoint::Query,
        Endpoint::Annotations,
        Endpoint::TagKeys,
        Endpoint::TagValues,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Root => "root",
            Endpoint::Search => "search",
            Endpoint::Query => "query",
            Endpoint::Annotations => "annotations",
            Endpoint::TagKeys => "tag-keys",
            Endpoint::TagValues => "tag-values",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ep| ep.name() == name)
    }

    pub fn default_path(&self) -> &'static str {
        match self {
            Endpoint::Root => "/",
            Endpoint::Search => "/search",
            Endpoint::Query => "/query",
            Endpoint::Annotations => "/annotations",
            Endpoint::TagKeys => "/tag-keys",
            Endpoint::TagValues => "/tag-values",
        }
    }

    /// Request variant decoded from bodies posted to this endpoint.
    pub fn request_kind(&self) -> Option<RequestKind> {
        match self {
            Endpoint::Root => None,
            Endpoint::Search => Some(RequestKind::Search),
            Endpoint::Query => Some(RequestKind::Query),
            Endpoint::Annotations => Some(RequestKind::Annotation),
            Endpoint::TagKeys => Some(RequestKind::TagKeys),
            Endpoint::TagValues => Some(RequestKind::TagValues),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone)]
struct Slot {
    path: String,
    handler: Option<BackendHandler>,
}

#[derive(Clone)]
pub struct RegistryBuilder {
    slots: BTreeMap<Endpoint, Slot>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        let slots = Endpoint::ALL
            .into_iter()
            .map(|ep| {
                (
                    ep,
                    Slot {
                        path: ep.default_path().to_string(),
                        handler: None,
                    },
                )
            })
            .collect();
        Self { slots }
    }

    /// Sets the path and handler of `endpoint`. The root endpoint never has a
    /// handler, so only its path is taken.
    pub fn set(
        mut self,
        endpoint: Endpoint,
        path: impl Into<String>,
        handler: Option<BackendHandler>,
    ) -> Self {
        let handler = if endpoint == Endpoint::Root { None } else { handler };
        self.slots.insert(
            endpoint,
            Slot {
                path: path.into(),
                handler,
            },
        );
        self
    }

    pub fn set_root(self, path: impl Into<String>) -> Self {
        self.set(Endpoint::Root, path, None)
    }

    pub fn set_search<F>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.set(Endpoint::Search, path, Some(Arc::new(handler)))
    }

    pub fn set_query<F>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.set(Endpoint::Query, path, Some(Arc::new(handler)))
    }

    pub fn set_annotations<F>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.set(Endpoint::Annotations, path, Some(Arc::new(handler)))
    }

    pub fn set_tag_keys<F>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.set(Endpoint::TagKeys, path, Some(Arc::new(handler)))
    }

    pub fn set_tag_values<F>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.set(Endpoint::TagValues, path, Some(Arc::new(handler)))
    }

    /// Overrides paths from an endpoint-name → path table, keeping handlers.
    pub fn apply_paths(mut self, paths: &BTreeMap<String, String>) -> Result<Self> {
        for (name, path) in paths {
            let endpoint = Endpoint::from_name(name)
                .ok_or_else(|| JsondsError::Config(format!("unknown endpoint {:?}", name)))?;
            if let Some(slot) = self.slots.get_mut(&endpoint) {
                slot.path = path.clone();
            }
        }
        Ok(self)
    }

    /// Freezes the registrations, installing the default handler wherever
    /// none was set.
    pub fn configure(&self) -> Registry {
        let mut routes = BTreeMap::new();
        for (&endpoint, slot) in &self.slots {
            let (handler, default_handler) = match (&slot.handler, endpoint) {
                (_, Endpoint::Root) => (None, false),
                (Some(handler), _) => (Some(handler.clone()), false),
                (None, _) => (Some(unhandled(endpoint)), true),
            };

            if endpoint != Endpoint::Root {
                info!(
                    endpoint = %endpoint,
                    path = %slot.path,
                    default_handler,
                    "Configured endpoint"
                );
            }

            routes.insert(
                endpoint,
                Route {
                    path: slot.path.clone(),
                    handler,
                    default_handler,
                },
            );
        }

        let mut seen: HashMap<&str, Endpoint> = HashMap::new();
        for (&endpoint, route) in &routes {
            if let Some(other) = seen.insert(route.path.as_str(), endpoint) {
                warn!(path = %route.path, first = %other, second = %endpoint, "Duplicate endpoint path");
            }
        }

        Registry { routes }
    }
}

fn unhandled(endpoint: Endpoint) -> BackendHandler {
    Arc::new(move |_req: &Request| Err(JsondsError::Unhandled(endpoint)))
}

#[derive(Clone)]
struct Route {
    path: String,
    handler: Option<BackendHandler>,
    default_handler: bool,
}

/// Frozen endpoint table. Cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct Registry {
    routes: BTreeMap<Endpoint, Route>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (endpoint, route) in &self.routes {
            map.entry(&endpoint.name(), &(&route.path, route.default_handler));
        }
        map.finish()
    }
}

impl Registry {
    pub fn path(&self, endpoint: Endpoint) -> &str {
        self.routes
            .get(&endpoint)
            .map(|route| route.path.as_str())
            .unwrap_or_else(|| endpoint.default_path())
    }

    pub fn uses_default_handler(&self, endpoint: Endpoint) -> bool {
        self.routes
            .get(&endpoint)
            .map(|route| route.default_handler)
            .unwrap_or(true)
    }

    /// `(endpoint, path)` pairs in declaration order.
    pub fn endpoints(&self) -> impl Iterator<Item = (Endpoint, &str)> + '_ {
        self.routes
            .iter()
            .map(|(&endpoint, route)| (endpoint, route.path.as_str()))
    }

    /// Runs the handler registered for `endpoint`.
    pub fn invoke(&self, endpoint: Endpoint, request: &Request) -> Result<Response> {
        let handler = self
            .routes
            .get(&endpoint)
            .and_then(|route| route.handler.as_ref())
            .ok_or(JsondsError::Unhandled(endpoint))?;
        handler(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SearchRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn search_request() -> Request {
        Request::Search(SearchRequest {
            target: "up".into(),
        })
    }

    #[test]
    fn test_defaults_installed_for_missing_handlers() {
        let registry = RegistryBuilder::new().configure();
        for endpoint in Endpoint::ALL {
            assert_eq!(registry.path(endpoint), endpoint.default_path());
            if endpoint == Endpoint::Root {
                continue;
            }
            assert!(registry.uses_default_handler(endpoint));
            let err = registry.invoke(endpoint, &search_request()).unwrap_err();
            assert!(matches!(err, JsondsError::Unhandled(ep) if ep == endpoint));
        }
    }

    #[test]
    fn test_registered_handler_invoked_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = RegistryBuilder::new()
            .set_search("/find", move |req| {
                counter.fetch_add(1, Ordering::SeqCst);
                let target = req.as_search().map(|s| s.target.clone()).unwrap_or_default();
                Ok(Response::Search(vec![target]))
            })
            .configure();

        assert_eq!(registry.path(Endpoint::Search), "/find");
        assert!(!registry.uses_default_handler(Endpoint::Search));
        let response = registry.invoke(Endpoint::Search, &search_request()).unwrap();
        assert_eq!(response, Response::Search(vec!["up".into()]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clearing_handler_falls_back_to_default() {
        let registry = RegistryBuilder::new()
            .set_query("/query", |_| Ok(Response::TimeSeries(vec![])))
            .set(Endpoint::Query, "/q", None)
            .configure();
        assert_eq!(registry.path(Endpoint::Query), "/q");
        assert!(registry.uses_default_handler(Endpoint::Query));
    }

    #[test]
    fn test_root_only_takes_path() {
        let handler: BackendHandler = Arc::new(|_: &Request| Ok(Response::Invalid));
        let registry = RegistryBuilder::new()
            .set(Endpoint::Root, "/health", Some(handler))
            .configure();
        assert_eq!(registry.path(Endpoint::Root), "/health");
        assert!(registry.invoke(Endpoint::Root, &search_request()).is_err());
    }

    #[test]
    fn test_configure_is_repeatable() {
        let builder = RegistryBuilder::new()
            .set_root("/status")
            .set_tag_keys("/keys", |_| Ok(Response::TagKeys(vec![])));
        let first = builder.configure();
        let second = builder.configure();
        let first_paths: Vec<_> = first.endpoints().collect();
        let second_paths: Vec<_> = second.endpoints().collect();
        assert_eq!(first_paths, second_paths);
        for endpoint in Endpoint::ALL {
            assert_eq!(
                first.uses_default_handler(endpoint),
                second.uses_default_handler(endpoint)
            );
        }
    }

    #[test]
    fn test_apply_paths() {
        let mut paths = BTreeMap::new();
        paths.insert("tag-values".to_string(), "/values".to_string());
        let registry = RegistryBuilder::new()
            .apply_paths(&paths)
            .unwrap()
            .configure();
        assert_eq!(registry.path(Endpoint::TagValues), "/values");

        paths.insert("bogus".to_string(), "/x".to_string());
        assert!(matches!(
            RegistryBuilder::new().apply_paths(&paths),
            Err(JsondsError::Config(_))
        ));
    }
}
