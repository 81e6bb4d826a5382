//! Per-request call context.
//!
//! Every operation receives a [`ServerCallContext`] built from the incoming
//! HTTP request before dispatch: the caller's identity, the tenant the
//! endpoint serves, a snapshot of the request headers and the resolved
//! method name, plus the protocol version and extensions the client asked
//! for. The context is immutable once built.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::HeaderMap;

/// Header carrying the protocol version requested by the client.
pub const X_A2A_VERSION: &str = "x-a2a-version";

/// Header carrying the protocol extensions requested by the client.
pub const X_A2A_EXTENSIONS: &str = "x-a2a-extensions";

/// State-bag key under which the request headers snapshot is stored.
pub const HEADERS_KEY: &str = "headers";

/// State-bag key under which the resolved method name is stored.
pub const METHOD_NAME_KEY: &str = "method_name";

/// The identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// No credentials were presented or resolved.
    Unauthenticated,
    /// An authenticated caller.
    Authenticated {
        /// The resolved username.
        username: String,
    },
}

impl Principal {
    /// Whether the caller is authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::Authenticated { .. })
    }

    /// The caller's username, if authenticated.
    pub fn username(&self) -> Option<&str> {
        match self {
            Principal::Authenticated { username } => Some(username),
            Principal::Unauthenticated => None,
        }
    }
}

/// Immutable per-request context handed to every handler operation.
#[derive(Debug, Clone)]
pub struct ServerCallContext {
    principal: Principal,
    tenant_uid: String,
    state: HashMap<String, serde_json::Value>,
    requested_extensions: HashSet<String>,
    requested_version: Option<String>,
}

impl ServerCallContext {
    /// The caller's identity.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The tenant this endpoint serves. Empty when single-tenant.
    pub fn tenant_uid(&self) -> &str {
        &self.tenant_uid
    }

    /// Look up a value from the state bag.
    pub fn state(&self, key: &str) -> Option<&serde_json::Value> {
        self.state.get(key)
    }

    /// The request headers snapshot (first value per header name).
    pub fn headers(&self) -> HashMap<String, String> {
        self.state
            .get(HEADERS_KEY)
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The resolved A2A method name, empty for card requests.
    pub fn method_name(&self) -> &str {
        self.state
            .get(METHOD_NAME_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    /// Extensions the client requested via `X-A2A-Extensions`.
    pub fn requested_extensions(&self) -> &HashSet<String> {
        &self.requested_extensions
    }

    /// Protocol version the client requested via `X-A2A-Version`, if any.
    pub fn requested_version(&self) -> Option<&str> {
        self.requested_version.as_deref()
    }
}

/// Resolves the caller's identity from the request headers.
///
/// The default [`NoIdentity`] resolver treats every request as
/// unauthenticated; deployments with an authentication layer plug in
/// their own resolver.
pub trait IdentityResolver: Send + Sync {
    /// Resolve the caller's identity, or `Principal::Unauthenticated`.
    fn resolve(&self, headers: &HeaderMap) -> Principal;
}

/// Identity resolver that never authenticates anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentity;

impl IdentityResolver for NoIdentity {
    fn resolve(&self, _headers: &HeaderMap) -> Principal {
        Principal::Unauthenticated
    }
}

/// Builds a [`ServerCallContext`] for each incoming request.
#[derive(Clone)]
pub struct CallContextFactory {
    tenant_uid: String,
    identity: Arc<dyn IdentityResolver>,
}

impl CallContextFactory {
    /// Create a single-tenant factory with no authentication.
    pub fn new() -> Self {
        Self::for_tenant("")
    }

    /// Create a factory for the given tenant with no authentication.
    pub fn for_tenant(tenant_uid: impl Into<String>) -> Self {
        Self {
            tenant_uid: tenant_uid.into(),
            identity: Arc::new(NoIdentity),
        }
    }

    /// Replace the identity resolver.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    /// Build the context for a request.
    ///
    /// `method_name` is the A2A method being invoked; pass `None` for
    /// endpoints outside the method surface (agent card requests).
    pub fn build(&self, headers: &HeaderMap, method_name: Option<&str>) -> ServerCallContext {
        let principal = self.identity.resolve(headers);

        // First occurrence wins for repeated header names.
        let mut header_snapshot = serde_json::Map::new();
        for (name, value) in headers {
            header_snapshot
                .entry(name.as_str().to_string())
                .or_insert_with(|| {
                    serde_json::Value::String(value.to_str().unwrap_or_default().to_string())
                });
        }

        let mut state = HashMap::new();
        state.insert(
            HEADERS_KEY.to_string(),
            serde_json::Value::Object(header_snapshot),
        );
        state.insert(
            METHOD_NAME_KEY.to_string(),
            serde_json::Value::String(method_name.unwrap_or_default().to_string()),
        );

        let requested_version = headers
            .get(X_A2A_VERSION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let requested_extensions = requested_extensions(headers);

        ServerCallContext {
            principal,
            tenant_uid: self.tenant_uid.clone(),
            state,
            requested_extensions,
            requested_version,
        }
    }
}

impl Default for CallContextFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the `X-A2A-Extensions` header values into a set of extension URIs.
///
/// Each header occurrence may carry a comma-separated list; entries are
/// trimmed and empty entries dropped.
fn requested_extensions(headers: &HeaderMap) -> HashSet<String> {
    headers
        .get_all(X_A2A_EXTENSIONS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn build_captures_method_and_headers() {
        let factory = CallContextFactory::new();
        let ctx = factory.build(
            &headers(&[("content-type", "application/json")]),
            Some("message/send"),
        );

        assert_eq!(ctx.method_name(), "message/send");
        assert_eq!(
            ctx.headers().get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(ctx.principal(), &Principal::Unauthenticated);
        assert_eq!(ctx.tenant_uid(), "");
    }

    #[test]
    fn first_header_occurrence_wins() {
        let factory = CallContextFactory::new();
        let ctx = factory.build(
            &headers(&[("x-custom", "first"), ("x-custom", "second")]),
            None,
        );

        assert_eq!(
            ctx.headers().get("x-custom").map(String::as_str),
            Some("first")
        );
    }

    #[test]
    fn missing_method_name_is_empty() {
        let factory = CallContextFactory::new();
        let ctx = factory.build(&HeaderMap::new(), None);
        assert_eq!(ctx.method_name(), "");
    }

    #[test]
    fn requested_version_from_header() {
        let factory = CallContextFactory::new();
        let ctx = factory.build(&headers(&[("x-a2a-version", "0.3.0")]), None);
        assert_eq!(ctx.requested_version(), Some("0.3.0"));

        let ctx = factory.build(&HeaderMap::new(), None);
        assert_eq!(ctx.requested_version(), None);
    }

    #[test]
    fn extensions_split_and_trimmed() {
        let factory = CallContextFactory::new();
        let ctx = factory.build(
            &headers(&[
                ("x-a2a-extensions", "urn:ext:a, urn:ext:b"),
                ("x-a2a-extensions", "urn:ext:c"),
                ("x-a2a-extensions", " , "),
            ]),
            None,
        );

        let exts = ctx.requested_extensions();
        assert_eq!(exts.len(), 3);
        assert!(exts.contains("urn:ext:a"));
        assert!(exts.contains("urn:ext:b"));
        assert!(exts.contains("urn:ext:c"));
    }

    #[test]
    fn tenant_uid_propagates() {
        let factory = CallContextFactory::for_tenant("acme");
        let ctx = factory.build(&HeaderMap::new(), Some("tasks/get"));
        assert_eq!(ctx.tenant_uid(), "acme");
    }

    struct FixedIdentity(&'static str);

    impl IdentityResolver for FixedIdentity {
        fn resolve(&self, _headers: &HeaderMap) -> Principal {
            Principal::Authenticated {
                username: self.0.to_string(),
            }
        }
    }

    #[test]
    fn identity_resolver_sets_principal() {
        let factory = CallContextFactory::new().with_identity(Arc::new(FixedIdentity("alice")));
        let ctx = factory.build(&HeaderMap::new(), None);

        assert!(ctx.principal().is_authenticated());
        assert_eq!(ctx.principal().username(), Some("alice"));
    }
}
