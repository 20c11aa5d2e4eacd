//! `keyproxy` - key-gated forwarding proxy with link rewriting.
//!
//! Copyright (C) 2026 Maverick
//! SPDX-License-Identifier: AGPL-3.0-only
//!
//! Initializes the application runtime, loads configuration, sets up logging,
//! and launches the proxy service.

use keyproxy::{Config, KeyProxy, RewriteStats};

use pingora::proxy::http_proxy_service;
use pingora::server::Server;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    dotenvy::dotenv().ok();

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking);

    if log_format.eq_ignore_ascii_case("pretty") {
        subscriber.init();
    } else {
        subscriber.json().init();
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            drop(guard);
            std::process::exit(1);
        }
    };

    info!(
        listen_addr = %config.listen_addr,
        public_scheme = config.public_scheme.as_str(),
        query_policy = ?config.query_policy,
        verify_upstream_tls = config.verify_upstream_tls,
        log_format = %config.log_format,
        "Server initialized"
    );

    let mut server = Server::new(None).expect("Failed to create Pingora server");
    server.bootstrap();

    let proxy = KeyProxy::new(config.clone(), Arc::new(RewriteStats::new()));

    let mut proxy_service = http_proxy_service(&server.configuration, proxy);
    proxy_service.add_tcp(&config.listen_addr.to_string());
    server.add_service(proxy_service);

    server.run_forever();
}
