//! Request and response value types shared by the store, fetcher and router.

use bytes::Bytes;

/// Opaque identity of a cached entry.
///
/// The URL is kept verbatim; two identities match only if their method and
/// URL strings are equal after upper-casing the method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
    pub method: String,
    pub url: String,
}

impl RequestIdentity {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }

    /// Identity for a plain `GET` of `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }
}

/// An inbound resource request as seen by the router.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: String,
    pub url: String,
    /// Value of the `Accept` header, if the client sent one.
    pub accept: Option<String>,
}

impl ResourceRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".to_string(), url: url.into(), accept: None }
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity::new(&self.method, self.url.clone())
    }

    /// Whether the client declared it accepts HTML markup.
    pub fn accepts_html(&self) -> bool {
        self.accept
            .as_deref()
            .is_some_and(|accept| accept.to_ascii_lowercase().contains("text/html"))
    }
}

/// A captured response: status, headers and the full body.
///
/// The body is a `Bytes` buffer so a fetched response can be handed to the
/// caller and to a store write at the same time; both see the whole body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResourceResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Synthetic empty `404` returned when a tile cannot be fetched.
    pub fn not_found() -> Self {
        Self { status: 404, headers: Vec::new(), body: Bytes::new() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
