//! The concrete HTTP transport.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use kunai_core::config::TransportConfig;
use kunai_core::error::{SyncError, SyncResult};

use crate::Transport;
use crate::caches::TransportCaches;
use crate::connection::{Connection, CredentialPrompter, Credentials};
use crate::discover::{DnsLookup, pseudo_scheme_host, resolve_bootstrap};
use crate::request::DavRequest;
use crate::response::DavResponse;
use kunai_rfc::dav::MultiStatus;

/// HTTP transport over reqwest.
///
/// Redirects are followed manually (the connection must learn the new
/// origin) and 401s are retried with optionally re-prompted credentials.
pub struct DavClient<P, D> {
    http: reqwest::Client,
    caches: TransportCaches,
    prompter: P,
    dns: D,
    config: TransportConfig,
}

impl<P, D> DavClient<P, D>
where
    P: CredentialPrompter,
    D: DnsLookup,
{
    /// ## Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: TransportConfig, prompter: P, dns: D) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::network(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            caches: TransportCaches::new(),
            prompter,
            dns,
            config,
        })
    }

    #[must_use]
    pub fn caches(&self) -> &TransportCaches {
        &self.caches
    }

    /// Remembers a host for pre-emptive Basic auth after the hand-built
    /// header rescued an exchange the challenge round-trip failed.
    fn note_manual_success(&self, used_manual_header: bool, host: &str) {
        if used_manual_header {
            self.caches.mark_problematic(host);
        }
    }

    async fn dispatch(
        &self,
        request: &DavRequest,
        conn: &mut Connection,
        url: &str,
        force_manual: bool,
    ) -> SyncResult<reqwest::Response> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| SyncError::network(format!("invalid method: {e}")))?;

        let mut builder = self.http.request(method, url);

        let mut has_content_type = false;
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case("content-type") {
                has_content_type = true;
            }
            builder = builder.header(*name, value);
        }

        if let Some(body) = &request.body {
            if !has_content_type {
                builder = builder.header("Content-Type", "application/xml; charset=utf-8");
            }
            builder = builder.body(body.clone());
        }

        // Hosts that mangle the challenge round-trip get the header built
        // by hand on every request.
        if force_manual || self.caches.is_problematic(&conn.fqdn) {
            builder = builder.header("Authorization", basic_header(&conn.credentials));
        } else {
            builder = builder.basic_auth(
                conn.credentials.username.clone(),
                Some(conn.credentials.password.clone()),
            );
        }

        builder.send().await.map_err(|e| {
            SyncError::network(format!("{} {url}: {e}", request.method))
                .with_detail(dump(request, url, None, None))
        })
    }
}

impl<P, D> Transport for DavClient<P, D>
where
    P: CredentialPrompter,
    D: DnsLookup,
{
    fn note_problematic_host(&self, host: &str) {
        self.caches.mark_problematic(host);
    }

    #[expect(clippy::too_many_lines)]
    async fn send(&self, request: DavRequest, conn: &mut Connection) -> SyncResult<DavResponse> {
        let mut path = request.path.clone();

        if let Some((kind, host)) = pseudo_scheme_host(&path) {
            let root = resolve_bootstrap(&self.dns, kind, host).await;
            conn.scheme = root.scheme;
            conn.fqdn = root.fqdn;
            path = root.path;
        }

        let mut redirects: u8 = 0;
        let mut auth_attempts: u8 = 0;
        let mut manual_retry = false;

        loop {
            let url = conn.resolve(&path);
            tracing::debug!(method = %request.method, %url, "sending");

            let response = self.dispatch(&request, conn, &url, manual_retry).await?;
            let status = response.status().as_u16();

            match status {
                207 => {
                    let body = read_body(response, &request, &url).await?;
                    let Some(ms) = MultiStatus::parse(&body) else {
                        return Err(
                            SyncError::malformed(format!("unparseable multistatus from {url}"))
                                .with_detail(dump(&request, &url, Some(status), Some(&body))),
                        );
                    };
                    self.note_manual_success(manual_retry, &conn.fqdn);
                    return Ok(DavResponse::MultiStatus(ms));
                }
                // Success with no meaningful body; some servers answer
                // DELETE with 200.
                200 | 201 | 204 => {
                    self.note_manual_success(manual_retry, &conn.fqdn);
                    return Ok(DavResponse::Ok { status });
                }
                301 | 302 | 303 | 307 | 308 => {
                    redirects += 1;
                    if redirects > self.config.redirect_limit {
                        return Err(SyncError::network(format!(
                            "too many redirects at {url}"
                        )));
                    }
                    let Some(location) = response
                        .headers()
                        .get("location")
                        .and_then(|v| v.to_str().ok())
                    else {
                        return Err(
                            SyncError::status(status, format!("redirect without location at {url}"))
                        );
                    };
                    tracing::debug!(%location, "following redirect");
                    path = location.to_string();
                }
                401 => {
                    if let Some(realm) = response
                        .headers()
                        .get("www-authenticate")
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_realm)
                    {
                        self.caches.remember_realm(&conn.fqdn, &realm);
                    }

                    auth_attempts += 1;
                    if auth_attempts >= self.config.auth_retries {
                        return Err(SyncError::authentication(format!(
                            "401 from {url} after {auth_attempts} attempts"
                        ))
                        .with_detail(dump(&request, &url, Some(status), None)));
                    }

                    let mut rotated = false;
                    if auth_attempts == 1 && conn.owns_credentials {
                        let realm = self.caches.realm_for(&conn.fqdn);
                        if let Some(fresh) = self
                            .prompter
                            .prompt(
                                &conn.fqdn,
                                realm.as_deref(),
                                &conn.credentials.username,
                            )
                            .await
                        {
                            rotated = fresh != conn.credentials;
                            conn.credentials = fresh;
                        }
                    }
                    // Re-challenged on unchanged credentials: retry with
                    // the hand-built header before concluding the password
                    // is wrong. The host is only flagged if that retry
                    // succeeds.
                    manual_retry = !rotated;
                }
                s if request.is_soft(s) => {
                    self.note_manual_success(manual_retry, &conn.fqdn);
                    // One known provider answers 404 on a valid principal
                    // path while still sending a usable multistatus body.
                    let body = read_body(response, &request, &url).await.unwrap_or_default();
                    if let Some(ms) = MultiStatus::parse(&body) {
                        tracing::debug!(status = s, %url, "soft status with usable multistatus");
                        return Ok(DavResponse::MultiStatus(ms));
                    }
                    tracing::debug!(status = s, %url, "soft-failed status");
                    return Ok(DavResponse::SoftError { status: s });
                }
                s => {
                    let body = read_body(response, &request, &url).await.unwrap_or_default();
                    return Err(SyncError::status(s, url.clone())
                        .with_detail(dump(&request, &url, Some(s), Some(&body))));
                }
            }
        }
    }
}

async fn read_body(
    response: reqwest::Response,
    request: &DavRequest,
    url: &str,
) -> SyncResult<String> {
    response.text().await.map_err(|e| {
        SyncError::network(format!("reading body from {url}: {e}"))
            .with_detail(dump(request, url, None, None))
    })
}

/// Manually-constructed Basic header for problematic hosts.
#[must_use]
pub fn basic_header(credentials: &Credentials) -> String {
    let pair = format!("{}:{}", credentials.username, credentials.password);
    format!("Basic {}", BASE64.encode(pair))
}

/// `realm="..."` from a `WWW-Authenticate` header.
#[must_use]
pub fn parse_realm(header: &str) -> Option<String> {
    let start = header.find("realm=\"")? + "realm=\"".len();
    let rest = &header[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Request/response dump attached to terminal errors for the event log.
fn dump(request: &DavRequest, url: &str, status: Option<u16>, body: Option<&str>) -> String {
    let mut out = format!("{} {url}\n", request.method);
    if let Some(request_body) = &request.body {
        out.push_str(request_body);
        out.push('\n');
    }
    if let Some(status) = status {
        out.push_str(&format!("=> HTTP {status}\n"));
    }
    if let Some(body) = body {
        out.push_str(body);
    }
    out
}
