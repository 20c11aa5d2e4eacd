//! Proxy service logic.
//!
//! Wires target resolution, header filtering, forwarding and response
//! rewriting into pingora's request phases.

use crate::config::{Config, RelayError};
use crate::core::proxy::headers::{
    apply_response_policy, has_content_encoding, request_identity_encoding,
    strip_inbound_headers,
};
use crate::core::proxy::response::{serve_error, serve_text};
use crate::core::proxy::upstream::{UpstreamTarget, build_peer, prepare_upstream_request};
use crate::core::rewrite::{
    RewriteContext, TargetResolver, is_html, is_redirect, rewrite_html, rewrite_location,
};
use crate::core::stats::RewriteStats;
use async_trait::async_trait;
use bytes::Bytes;
use pingora::Result;
use pingora::http::ResponseHeader;
use pingora::proxy::{FailToProxy, ProxyHttp, Session};
use pingora::upstreams::peer::HttpPeer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const PLACEHOLDER_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Context for a single request.
#[derive(Default)]
pub struct RequestCtx {
    pub upstream: Option<UpstreamTarget>,
    pub rewrite: Option<RewriteContext>,
    pub rewrite_html: bool,
    pub body_buffer: Vec<u8>,
}

/// Main proxy service implementing `ProxyHttp`.
pub struct KeyProxy {
    config: Arc<Config>,
    resolver: TargetResolver,
    stats: Arc<RewriteStats>,
}

impl KeyProxy {
    /// Creates a new `KeyProxy` service.
    #[must_use]
    pub fn new(config: Arc<Config>, stats: Arc<RewriteStats>) -> Self {
        let resolver = TargetResolver::from_config(&config);
        Self {
            config,
            resolver,
            stats,
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &Arc<RewriteStats> {
        &self.stats
    }

    fn proxy_host(&self, session: &Session) -> String {
        let req = session.req_header();
        req.headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty())
            .map(ToString::to_string)
            .or_else(|| req.uri.authority().map(|a| a.as_str().to_string()))
            .unwrap_or_else(|| self.config.listen_addr.to_string())
    }

    /// Redirect or HTML decision plus the header policy, shared by
    /// `response_filter`.
    fn rewrite_response_header(
        &self,
        upstream_response: &mut ResponseHeader,
        is_head: bool,
        ctx: &mut RequestCtx,
    ) -> Result<()> {
        let status = upstream_response.status.as_u16();

        if is_redirect(status) {
            self.rewrite_redirect(upstream_response, ctx)?;
        } else if !is_head
            && upstream_response
                .headers
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(is_html)
        {
            if has_content_encoding(upstream_response) {
                self.stats.record_skipped(1);
                debug!(action = "SKIP", "Encoded HTML body passed through unmodified");
            } else {
                ctx.rewrite_html = true;
                upstream_response.remove_header("Content-Length");
            }
        }

        apply_response_policy(upstream_response)
    }

    fn rewrite_redirect(
        &self,
        upstream_response: &mut ResponseHeader,
        ctx: &RequestCtx,
    ) -> Result<()> {
        let Some(rewrite) = ctx.rewrite.as_ref() else {
            return Ok(());
        };
        let Some(raw) = upstream_response.headers.get(http::header::LOCATION) else {
            return Ok(());
        };

        let rewritten = raw
            .to_str()
            .map_err(|e| RelayError::RewriteSkipped {
                value: String::from_utf8_lossy(raw.as_bytes()).into_owned(),
                reason: e.to_string(),
            })
            .and_then(|location| rewrite_location(location, rewrite));

        match rewritten {
            Ok(location) => {
                upstream_response.insert_header("Location", location)?;
                self.stats.record_redirect();
            }
            Err(e) => {
                self.stats.record_skipped(1);
                debug!(error = %e, action = "SKIP", "Redirect location left unmodified");
            }
        }
        Ok(())
    }

    /// Buffers HTML chunks and emits the rewritten document at end of stream.
    fn rewrite_body_chunk(
        &self,
        body: &mut Option<Bytes>,
        end_of_stream: bool,
        ctx: &mut RequestCtx,
    ) {
        if !ctx.rewrite_html {
            return;
        }

        if let Some(chunk) = body.take() {
            ctx.body_buffer.extend_from_slice(&chunk);
        }
        if !end_of_stream {
            return;
        }

        let raw = std::mem::take(&mut ctx.body_buffer);
        let Some(rewrite) = ctx.rewrite.as_ref() else {
            *body = Some(Bytes::from(raw));
            return;
        };

        let text = String::from_utf8_lossy(&raw);
        let result = rewrite_html(&text, rewrite);
        self.stats.record_links(result.rewritten);
        self.stats.record_skipped(result.skipped);
        debug!(
            rewritten = result.rewritten,
            skipped = result.skipped,
            bytes = result.body.len(),
            "HTML body rewritten"
        );
        *body = Some(Bytes::from(result.body));
    }
}

#[async_trait]
impl ProxyHttp for KeyProxy {
    type CTX = RequestCtx;

    fn new_ctx(&self) -> Self::CTX {
        RequestCtx::default()
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let path = session.req_header().uri.path().to_string();

        if path == "/" {
            return serve_text(
                session,
                200,
                PLACEHOLDER_CONTENT_TYPE,
                &self.config.placeholder_text,
            )
            .await;
        }

        let query = session.req_header().uri.query().map(ToString::to_string);
        let resolved = self
            .resolver
            .resolve(&path, query.as_deref())
            .and_then(|target| {
                UpstreamTarget::from_url(&target.url).map(|upstream| (target, upstream))
            });

        let (target, upstream) = match resolved {
            Ok(pair) => pair,
            Err(e) => {
                self.stats.record_rejected();
                let method = session.req_header().method.as_str();
                warn!(
                    http_method = %method,
                    status = e.status_code(),
                    action = "REJECT",
                    "Request rejected"
                );
                debug!(error = %e, "Rejection detail");
                return serve_error(session, &e).await;
            }
        };

        let proxy_host = self.proxy_host(session);
        ctx.rewrite = Some(RewriteContext::new(
            self.config.public_scheme.as_str(),
            &proxy_host,
            &target.key,
            target.url,
        ));
        ctx.upstream = Some(upstream);

        session.upstream_compression.adjust_decompression(true);
        self.stats.record_proxied();
        Ok(false)
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let Some(upstream) = ctx.upstream.as_ref() else {
            return Err(pingora::Error::explain(
                pingora::ErrorType::InternalError,
                "upstream peer requested without a resolved target",
            ));
        };

        build_peer(upstream, self.config.verify_upstream_tls)
            .await
            .map_err(|e| pingora::Error::explain(pingora::ErrorType::ConnectNoRoute, e.to_string()))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut pingora::http::RequestHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        let dropped = strip_inbound_headers(upstream_request);
        if dropped > 0 {
            debug!(dropped = dropped, "Stripped edge headers");
        }

        let Some(upstream) = ctx.upstream.as_ref() else {
            return Err(pingora::Error::explain(
                pingora::ErrorType::InternalError,
                "upstream request without a resolved target",
            ));
        };
        request_identity_encoding(upstream_request)?;
        prepare_upstream_request(upstream_request, upstream)
    }

    async fn response_filter(
        &self,
        session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        let is_head = session.req_header().method == http::Method::HEAD;
        self.rewrite_response_header(upstream_response, is_head, ctx)
    }

    fn response_body_filter(
        &self,
        _session: &mut Session,
        body: &mut Option<Bytes>,
        end_of_stream: bool,
        ctx: &mut Self::CTX,
    ) -> Result<Option<Duration>> {
        self.rewrite_body_chunk(body, end_of_stream, ctx);
        Ok(None)
    }

    async fn fail_to_proxy(
        &self,
        session: &mut Session,
        e: &pingora::Error,
        ctx: &mut Self::CTX,
    ) -> FailToProxy {
        self.stats.record_upstream_failure();
        let target_host = ctx.upstream.as_ref().map(|u| u.host.as_str());
        warn!(target_host = ?target_host, error = %e, action = "FAIL", "Proxying failed");

        let error_code = if let Some(written) = session.response_written() {
            written.status.as_u16()
        } else {
            let err = RelayError::UpstreamUnavailable(e.to_string());
            if let Err(write_err) = serve_error(session, &err).await {
                debug!(error = %write_err, "Failed to write error response");
            }
            err.status_code()
        };

        FailToProxy {
            error_code,
            can_reuse_downstream: false,
        }
    }

    async fn logging(
        &self,
        session: &mut Session,
        _e: Option<&pingora::Error>,
        ctx: &mut Self::CTX,
    ) {
        let status = session.response_written().map_or(0, |r| r.status.as_u16());
        let method = session.req_header().method.as_str();
        let target_host = ctx.upstream.as_ref().map_or("-", |u| u.host.as_str());

        if status >= 400 {
            warn!(http_method = %method, target_host = %target_host, status = status, "Request error");
        } else {
            info!(http_method = %method, target_host = %target_host, status = status, "Request completed");
        }
    }
}
