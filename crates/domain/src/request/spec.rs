//! Request specification type

use serde::{Deserialize, Serialize};
use url::Url;

use super::HttpMethod;
use crate::error::{DomainError, DomainResult};

/// A request to issue against the server under test.
///
/// Built with consuming setters. The path is relative to the gateway base
/// URL unless an absolute URL override is set. A subdomain label is
/// prepended to the base host, for gateways that serve content from
/// `<label>.<host>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path below the base URL, e.g. `/ipfs/bafy/file.txt`.
    pub path: String,
    /// Absolute URL that replaces `base + path` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Label prepended to the base host, e.g. `bafy.ipfs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    /// Request headers in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    /// Query parameters appended to the URL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

impl RequestSpec {
    /// Creates an empty GET request for `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: "/".to_string(),
            ..Self::default()
        }
    }

    /// Creates a GET request for a path.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new().path(path)
    }

    /// Sets the method.
    #[must_use]
    pub const fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Overrides the full URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sends the request to `<label>.<base host>`.
    #[must_use]
    pub fn subdomain(mut self, label: impl Into<String>) -> Self {
        self.subdomain = Some(label.into());
        self
    }

    /// Whether the request targets a subdomain of the base host.
    #[must_use]
    pub const fn targets_subdomain(&self) -> bool {
        self.subdomain.is_some() && self.url.is_none()
    }

    /// Sets a header, replacing any existing value for the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Sets several headers.
    #[must_use]
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |request, (name, value)| request.header(name, value))
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Looks up a header value (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the header is set.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.header_value(name).is_some()
    }

    /// Resolves the request against a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the resulting URL does not parse
    /// or the subdomain does not form a valid host.
    pub fn resolve(&self, base: &Url) -> DomainResult<ResolvedRequest> {
        let raw = self.url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}",
                base.as_str().trim_end_matches('/'),
                self.path.trim_start_matches('/')
            )
        });

        let mut url = Url::parse(&raw).map_err(|e| DomainError::InvalidUrl(format!("{raw}: {e}")))?;
        if self.targets_subdomain()
            && let Some(label) = &self.subdomain
        {
            let host = match url.host_str() {
                Some(host) => format!("{}.{host}", label.trim_end_matches('.')),
                None => return Err(DomainError::InvalidUrl(format!("{raw}: no host"))),
            };
            url.set_host(Some(&host))
                .map_err(|e| DomainError::InvalidUrl(format!("{host}: {e}")))?;
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        Ok(ResolvedRequest {
            method: self.method,
            url,
            headers: self.headers.clone(),
            body: self.body.clone(),
        })
    }
}

/// A request ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: Url,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Body, if any.
    pub body: Option<Vec<u8>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8080/").unwrap()
    }

    #[test]
    fn test_resolve_joins_base_and_path() {
        let resolved = RequestSpec::get("/ipfs/bafy/file.txt").resolve(&base()).unwrap();
        assert_eq!(resolved.url.as_str(), "http://127.0.0.1:8080/ipfs/bafy/file.txt");
        assert_eq!(resolved.method, HttpMethod::Get);
    }

    #[test]
    fn test_resolve_appends_query() {
        let resolved = RequestSpec::get("ipfs/bafy")
            .query("format", "raw")
            .query("filename", "a b.txt")
            .resolve(&base())
            .unwrap();
        assert_eq!(
            resolved.url.as_str(),
            "http://127.0.0.1:8080/ipfs/bafy?format=raw&filename=a+b.txt"
        );
    }

    #[test]
    fn test_url_override_wins() {
        let resolved = RequestSpec::get("/ignored")
            .url("http://bafy.ipfs.localhost:8080/")
            .resolve(&base())
            .unwrap();
        assert_eq!(resolved.url.host_str(), Some("bafy.ipfs.localhost"));
    }

    #[test]
    fn test_subdomain_prefixes_base_host() {
        let request = RequestSpec::get("/file.txt").subdomain("bafy.ipfs");
        assert!(request.targets_subdomain());
        let resolved = request
            .resolve(&Url::parse("http://localhost:8080").unwrap())
            .unwrap();
        assert_eq!(resolved.url.as_str(), "http://bafy.ipfs.localhost:8080/file.txt");
    }

    #[test]
    fn test_url_override_ignores_subdomain() {
        let request = RequestSpec::get("/")
            .subdomain("bafy.ipfs")
            .url("http://example.org/x");
        assert!(!request.targets_subdomain());
        assert_eq!(request.resolve(&base()).unwrap().url.as_str(), "http://example.org/x");
    }

    #[test]
    fn test_invalid_subdomain_is_construction_error() {
        let err = RequestSpec::get("/")
            .subdomain("bad label")
            .resolve(&Url::parse("http://localhost").unwrap())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidUrl(_)));
    }

    #[test]
    fn test_invalid_override_is_construction_error() {
        let err = RequestSpec::get("/").url("not a url").resolve(&base()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidUrl(_)));
    }

    #[test]
    fn test_header_replaces_case_insensitively() {
        let request = RequestSpec::get("/")
            .header("Accept", "text/html")
            .header("accept", "application/vnd.ipld.raw");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header_value("ACCEPT"), Some("application/vnd.ipld.raw"));
        assert!(!request.has_header("Range"));
    }

    #[test]
    fn test_derived_request_does_not_alias_base() {
        let base_request = RequestSpec::get("/ipfs/bafy");
        let derived = base_request.clone().header("Range", "bytes=0-1");
        assert!(!base_request.has_header("Range"));
        assert!(derived.has_header("Range"));
    }
}
