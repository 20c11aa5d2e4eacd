use async_compression::tokio::write::GzipEncoder;
use keyproxy::config::{Config, PublicScheme, QueryPolicy};
use keyproxy::core::proxy::KeyProxy;
use keyproxy::core::rewrite::encoding::encode_component;
use keyproxy::core::stats::RewriteStats;
use pingora::proxy::http_proxy_service;
use pingora::server::Server;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const KEY: &str = "abc123";

pub const HTML_BODY: &str = concat!(
    "<html><body>",
    r#"<a href="/about">About</a>"#,
    "<img src='logo.png'>",
    r##"<a href="#top">Top</a>"##,
    r#"<a href="https://other.example.org/x">Other</a>"#,
    "</body></html>"
);

/// Opaque bytes labelled `zstd`; pingora has no zstd decoder.
pub const ZSTD_BODY: &[u8] = b"\x28\xb5\x2f\xfd<a href=\"/about\">";

fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut response = format!("HTTP/1.1 {status}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let mut response = response.into_bytes();
    response.extend_from_slice(body);
    response
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Reads the request head and a `Content-Length` body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut expected = None;
    loop {
        if let Some(total) = expected
            && buf.len() >= total
        {
            break;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if expected.is_none()
                    && let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n")
                {
                    let head = String::from_utf8_lossy(&buf[..end]);
                    expected = Some(end + 4 + content_length(&head));
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

pub async fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzipEncoder::new(Vec::new());
    encoder.write_all(data).await.unwrap();
    encoder.shutdown().await.unwrap();
    encoder.into_inner()
}

fn route(request: &str, gzip_html: &[u8]) -> Vec<u8> {
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);

    match path {
        "/page" => http_response(
            "302 Found",
            &[
                ("Location", "/next"),
                ("Cache-Control", "public, max-age=600"),
            ],
            b"",
        ),
        "/index" => http_response(
            "200 OK",
            &[
                ("Content-Type", "text/html; charset=utf-8"),
                ("Cache-Control", "public, max-age=3600"),
            ],
            HTML_BODY.as_bytes(),
        ),
        "/gzip-index" => http_response(
            "200 OK",
            &[
                ("Content-Type", "text/html; charset=utf-8"),
                ("Content-Encoding", "gzip"),
            ],
            gzip_html,
        ),
        "/zstd-index" => http_response(
            "200 OK",
            &[
                ("Content-Type", "text/html; charset=utf-8"),
                ("Content-Encoding", "zstd"),
            ],
            ZSTD_BODY,
        ),
        "/echo" => http_response(
            "200 OK",
            &[("Content-Type", "text/plain")],
            request.as_bytes(),
        ),
        "/missing" => http_response("404 Not Found", &[("Content-Type", "text/plain")], b"nope"),
        _ => http_response(
            "200 OK",
            &[("Content-Type", "text/plain"), ("ETag", "\"v1\"")],
            b"Hello",
        ),
    }
}

pub async fn spawn_mock_backend() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let gzip_html = Arc::new(gzip(HTML_BODY.as_bytes()).await);

    tokio::spawn(async move {
        loop {
            if let Ok((mut socket, _)) = listener.accept().await {
                let gzip_html = Arc::clone(&gzip_html);
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    let response = route(&request, &gzip_html);
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        }
    });

    port
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub fn create_test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        secret_key: KEY.to_string(),
        public_scheme: PublicScheme::Http,
        query_policy: QueryPolicy::Append,
        placeholder_text: "Under maintenance...".to_string(),
        verify_upstream_tls: true,
        log_format: "pretty".to_string(),
    }
}

pub async fn spawn_proxy(mut config: Config) -> (u16, Arc<RewriteStats>) {
    let port = closed_port().await;
    config.listen_addr = format!("127.0.0.1:{port}").parse().unwrap();
    let config = Arc::new(config);
    let stats = Arc::new(RewriteStats::new());
    let stats_for_thread = Arc::clone(&stats);

    std::thread::spawn(move || {
        let proxy = KeyProxy::new(Arc::clone(&config), stats_for_thread);

        let server_conf = Arc::new(pingora::server::configuration::ServerConf::default());
        let mut service = http_proxy_service(&server_conf, proxy);
        service.add_tcp(&config.listen_addr.to_string());

        let mut server = Server::new(None).unwrap();
        server.bootstrap();
        server.add_service(service);
        server.run_forever();
    });

    tokio::time::sleep(Duration::from_secs(3)).await;
    (port, stats)
}

/// `http://127.0.0.1:{proxy_port}/{key}/{encoded target}`
pub fn proxied_url(proxy_port: u16, key: &str, target: &str) -> String {
    format!(
        "http://127.0.0.1:{proxy_port}/{key}/{}",
        encode_component(target)
    )
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
