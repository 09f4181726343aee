//! RFC 6764 bootstrap: SRV/TXT service discovery for CalDAV/CardDAV.
//!
//! The engine hands the transport a pseudo-URL such as
//! `carddav6764://example.com`; this module turns it into a concrete
//! scheme, host, and initial path before the real request goes out.

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use kunai_core::types::FolderKind;

/// One SRV answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvTarget {
    pub target: String,
    pub port: u16,
    pub priority: u16,
}

/// DNS lookups the bootstrap needs. Tests script this instead of
/// querying real resolvers.
pub trait DnsLookup {
    fn srv(&self, name: &str) -> impl Future<Output = Result<Vec<SrvTarget>, String>>;
    fn txt(&self, name: &str) -> impl Future<Output = Result<Vec<String>, String>>;
}

/// [`DnsLookup`] backed by hickory-resolver.
pub struct HickoryDns {
    resolver: TokioAsyncResolver,
}

impl HickoryDns {
    /// Uses the system resolver configuration, falling back to defaults
    /// (Google/Cloudflare roots) when none can be read.
    #[must_use]
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

impl Default for HickoryDns {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsLookup for HickoryDns {
    async fn srv(&self, name: &str) -> Result<Vec<SrvTarget>, String> {
        let lookup = self
            .resolver
            .srv_lookup(name)
            .await
            .map_err(|e| e.to_string())?;
        let mut targets: Vec<SrvTarget> = lookup
            .iter()
            .map(|srv| SrvTarget {
                target: srv.target().to_utf8().trim_end_matches('.').to_string(),
                port: srv.port(),
                priority: srv.priority(),
            })
            .collect();
        targets.sort_by_key(|t| t.priority);
        Ok(targets)
    }

    async fn txt(&self, name: &str) -> Result<Vec<String>, String> {
        let lookup = self
            .resolver
            .txt_lookup(name)
            .await
            .map_err(|e| e.to_string())?;
        Ok(lookup.iter().map(ToString::to_string).collect())
    }
}

/// Where the bootstrap landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRoot {
    pub scheme: String,
    pub fqdn: String,
    /// Initial request path: the TXT `path=` hint or the well-known path.
    pub path: String,
}

/// The bootstrap pseudo-scheme, if `path` carries one.
#[must_use]
pub fn pseudo_scheme_host(path: &str) -> Option<(FolderKind, &str)> {
    if let Some(host) = path.strip_prefix("caldav6764://") {
        Some((FolderKind::CalDav, host))
    } else if let Some(host) = path.strip_prefix("carddav6764://") {
        Some((FolderKind::CardDav, host))
    } else {
        None
    }
}

const fn service_label(kind: FolderKind) -> &'static str {
    match kind {
        FolderKind::CalDav | FolderKind::Ics => "caldav",
        FolderKind::CardDav => "carddav",
    }
}

/// Resolves a host per RFC 6764.
///
/// Tries the TLS SRV record first, then plaintext; the TXT record at the
/// same label may carry a `path=` hint. Any lookup failure degrades to
/// the host itself with the well-known path over https.
#[tracing::instrument(skip(dns))]
pub async fn resolve_bootstrap(
    dns: &impl DnsLookup,
    kind: FolderKind,
    host: &str,
) -> DiscoveredRoot {
    let label = service_label(kind);
    let well_known = format!("/.well-known/{label}");

    for (srv_name, scheme, default_port) in [
        (format!("_{label}s._tcp.{host}"), "https", 443),
        (format!("_{label}._tcp.{host}"), "http", 80),
    ] {
        let targets = match dns.srv(&srv_name).await {
            Ok(targets) if !targets.is_empty() => targets,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(name = %srv_name, error = %err, "SRV lookup failed");
                continue;
            }
        };

        let best = &targets[0];
        let fqdn = if best.port == default_port {
            best.target.clone()
        } else {
            format!("{}:{}", best.target, best.port)
        };

        let path = match dns.txt(&srv_name).await {
            Ok(records) => records
                .iter()
                .find_map(|r| txt_path_hint(r))
                .unwrap_or_else(|| well_known.clone()),
            Err(err) => {
                tracing::debug!(name = %srv_name, error = %err, "TXT lookup failed");
                well_known.clone()
            }
        };

        tracing::info!(host, %fqdn, %path, scheme, "service discovered via SRV");
        return DiscoveredRoot {
            scheme: scheme.to_string(),
            fqdn,
            path,
        };
    }

    tracing::info!(host, "no SRV records, falling back to well-known");
    DiscoveredRoot {
        scheme: "https".to_string(),
        fqdn: host.to_string(),
        path: well_known,
    }
}

fn txt_path_hint(record: &str) -> Option<String> {
    record
        .split(';')
        .map(str::trim)
        .find_map(|kv| kv.strip_prefix("path="))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedDns {
        srv: Vec<SrvTarget>,
        txt: Vec<String>,
    }

    impl DnsLookup for ScriptedDns {
        async fn srv(&self, name: &str) -> Result<Vec<SrvTarget>, String> {
            if name.starts_with("_carddavs.") || name.starts_with("_caldavs.") {
                Ok(self.srv.clone())
            } else {
                Err("no records".to_string())
            }
        }

        async fn txt(&self, _: &str) -> Result<Vec<String>, String> {
            Ok(self.txt.clone())
        }
    }

    #[test_log::test(tokio::test)]
    async fn srv_with_txt_path_hint() {
        let dns = ScriptedDns {
            srv: vec![SrvTarget {
                target: "dav.example.com".into(),
                port: 443,
                priority: 0,
            }],
            txt: vec!["path=/dav/addressbooks".into()],
        };
        let root = resolve_bootstrap(&dns, FolderKind::CardDav, "example.com").await;
        assert_eq!(root.scheme, "https");
        assert_eq!(root.fqdn, "dav.example.com");
        assert_eq!(root.path, "/dav/addressbooks");
    }

    #[test_log::test(tokio::test)]
    async fn srv_without_txt_uses_well_known() {
        let dns = ScriptedDns {
            srv: vec![SrvTarget {
                target: "dav.example.com".into(),
                port: 8443,
                priority: 0,
            }],
            txt: vec![],
        };
        let root = resolve_bootstrap(&dns, FolderKind::CalDav, "example.com").await;
        assert_eq!(root.fqdn, "dav.example.com:8443");
        assert_eq!(root.path, "/.well-known/caldav");
    }

    #[test_log::test(tokio::test)]
    async fn lookup_failure_falls_back_to_host() {
        let dns = ScriptedDns {
            srv: vec![],
            txt: vec![],
        };
        let root = resolve_bootstrap(&dns, FolderKind::CardDav, "example.com").await;
        assert_eq!(root.scheme, "https");
        assert_eq!(root.fqdn, "example.com");
        assert_eq!(root.path, "/.well-known/carddav");
    }

    #[test]
    fn pseudo_scheme_detection() {
        assert_eq!(
            pseudo_scheme_host("carddav6764://example.com"),
            Some((FolderKind::CardDav, "example.com"))
        );
        assert!(pseudo_scheme_host("/normal/path").is_none());
    }
}
