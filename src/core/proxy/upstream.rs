//! Forwarding to the resolved target.
//!
//! Builds the upstream peer and rewrites the outbound request line so the
//! target receives an origin-form request for its own path and host.

use crate::config::{RelayError, Result};
use pingora::http::RequestHeader;
use pingora::upstreams::peer::HttpPeer;
use url::{Host, Position, Url};

/// Connection and request-line details derived from a target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Host to resolve, without IPv6 brackets.
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// SNI name; empty for IP literals.
    pub sni: String,
    /// Value for the outbound `Host` header.
    pub authority: String,
    /// Origin-form request target; the fragment is never sent.
    pub path_and_query: String,
}

impl UpstreamTarget {
    /// # Errors
    ///
    /// Returns `RelayError::MalformedRequest` if the URL has no host or port.
    pub fn from_url(url: &Url) -> Result<Self> {
        let (host, sni) = match url.host() {
            Some(Host::Domain(domain)) => (domain.to_string(), domain.to_string()),
            Some(Host::Ipv4(ip)) => (ip.to_string(), String::new()),
            Some(Host::Ipv6(ip)) => (ip.to_string(), String::new()),
            None => {
                return Err(RelayError::MalformedRequest(
                    "target has no host".to_string(),
                ));
            }
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| RelayError::MalformedRequest("target has no port".to_string()))?;

        let host_str = url.host_str().unwrap_or(&host);
        let authority = url
            .port()
            .map_or_else(|| host_str.to_string(), |p| format!("{host_str}:{p}"));

        Ok(Self {
            host,
            port,
            tls: url.scheme() == "https",
            sni,
            authority,
            path_and_query: url[Position::BeforePath..Position::AfterQuery].to_string(),
        })
    }
}

/// Resolves the target host and builds the pingora peer.
///
/// # Errors
///
/// Returns `RelayError::UpstreamUnavailable` if name resolution fails.
pub async fn build_peer(target: &UpstreamTarget, verify_tls: bool) -> Result<Box<HttpPeer>> {
    let addr = tokio::net::lookup_host((target.host.as_str(), target.port))
        .await
        .map_err(|e| RelayError::UpstreamUnavailable(format!("resolve {}: {e}", target.host)))?
        .next()
        .ok_or_else(|| {
            RelayError::UpstreamUnavailable(format!("no address for {}", target.host))
        })?;

    let mut peer = HttpPeer::new(addr, target.tls, target.sni.clone());
    peer.options.verify_cert = verify_tls;
    peer.options.verify_hostname = verify_tls;
    Ok(Box::new(peer))
}

/// Points the outbound request at the target path and sets `Host`.
///
/// # Errors
///
/// Returns an error if the path is not a valid request URI or the header
/// cannot be inserted.
pub fn prepare_upstream_request(
    request: &mut RequestHeader,
    target: &UpstreamTarget,
) -> pingora::Result<()> {
    let uri: http::Uri = target.path_and_query.parse().map_err(|e| {
        pingora::Error::because(
            pingora::ErrorType::InternalError,
            "invalid upstream request URI",
            e,
        )
    })?;
    request.set_uri(uri);
    request.insert_header("Host", &target.authority)?;
    Ok(())
}
