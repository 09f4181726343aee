//! Request description handed to the transport.

/// HTTP method subset the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Propfind,
    Report,
    Put,
    Delete,
    Get,
    Options,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Propfind => "PROPFIND",
            Self::Report => "REPORT",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request: method, path, body, headers, and the per-call soft-fail
/// status set.
///
/// `path` is server-relative unless it is an absolute URL (which then
/// retargets the connection) or the RFC 6764 bootstrap pseudo-scheme.
#[derive(Debug, Clone)]
pub struct DavRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
    pub headers: Vec<(&'static str, String)>,
    /// Statuses the caller chooses to recover from in-band.
    pub soft_fail: Vec<u16>,
}

impl DavRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            soft_fail: Vec::new(),
        }
    }

    #[must_use]
    pub fn propfind(path: impl Into<String>, depth: u8, body: String) -> Self {
        Self::new(Method::Propfind, path)
            .with_body(body)
            .with_header("Depth", depth.to_string())
    }

    #[must_use]
    pub fn report(path: impl Into<String>, body: String) -> Self {
        Self::new(Method::Report, path)
            .with_body(body)
            .with_header("Depth", "1".to_string())
    }

    #[must_use]
    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }

    #[must_use]
    pub fn soft_fail_on(mut self, statuses: &[u16]) -> Self {
        self.soft_fail.extend_from_slice(statuses);
        self
    }

    #[must_use]
    pub fn is_soft(&self, status: u16) -> bool {
        self.soft_fail.contains(&status)
    }
}
