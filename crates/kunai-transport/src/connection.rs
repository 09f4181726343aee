//! Per-call connection context: origin, credentials, redirect tracking.

use url::Url;

/// Username/password pair fetched from the embedder's credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Connection context threaded through every transport call.
///
/// Mostly a value object; `scheme`/`fqdn` are the one piece of mutable
/// state, updated when the server redirects or an absolute URL is given,
/// so subsequent relative paths land on the discovered origin.
#[derive(Debug, Clone)]
pub struct Connection {
    pub scheme: String,
    /// Host, optionally with port.
    pub fqdn: String,
    pub credentials: Credentials,
    /// Whether the caller owns the account credentials and may have the
    /// prompter rotate them on a 401.
    pub owns_credentials: bool,
}

impl Connection {
    #[must_use]
    pub fn new(scheme: impl Into<String>, fqdn: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            scheme: scheme.into(),
            fqdn: fqdn.into(),
            credentials,
            owns_credentials: false,
        }
    }

    #[must_use]
    pub fn owning_credentials(mut self) -> Self {
        self.owns_credentials = true;
        self
    }

    /// `scheme://fqdn` with no trailing slash.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.fqdn)
    }

    /// Resolves a path against the origin. Absolute URLs are adopted:
    /// the connection's scheme/fqdn are updated and the URL is returned
    /// as-is.
    pub fn resolve(&mut self, path: &str) -> String {
        if let Ok(url) = Url::parse(path) {
            if matches!(url.scheme(), "http" | "https") {
                self.adopt(&url);
                return path.to_string();
            }
        }
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        format!("{}{path}", self.origin())
    }

    /// Updates scheme/fqdn from an absolute URL (redirect tracking).
    pub fn adopt(&mut self, url: &Url) {
        self.scheme = url.scheme().to_string();
        if let Some(host) = url.host_str() {
            self.fqdn = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
        }
    }
}

/// Asks the embedder for fresh credentials after a 401.
pub trait CredentialPrompter {
    /// Returns replacement credentials, or `None` to give up.
    fn prompt(
        &self,
        host: &str,
        realm: Option<&str>,
        username: &str,
    ) -> impl Future<Output = Option<Credentials>>;
}

/// Prompter that never supplies credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl CredentialPrompter for NoPrompt {
    async fn prompt(&self, _: &str, _: Option<&str>, _: &str) -> Option<Credentials> {
        None
    }
}
