use crate::common::{
    KEY, ZSTD_BODY, client, create_test_config, proxied_url, spawn_mock_backend, spawn_proxy,
};
use keyproxy::core::rewrite::encoding::encode_component;

#[tokio::test]
async fn test_redirect_location_rewritten() {
    let backend_port = spawn_mock_backend().await;
    let (proxy_port, stats) = spawn_proxy(create_test_config()).await;

    let url = proxied_url(
        proxy_port,
        KEY,
        &format!("http://127.0.0.1:{backend_port}/page"),
    );
    let resp = client().get(url).send().await.unwrap();

    assert_eq!(resp.status(), 302);
    let expected = format!(
        "/{KEY}/{}",
        encode_component(&format!("http://127.0.0.1:{backend_port}/next"))
    );
    assert_eq!(resp.headers().get("location").unwrap(), expected.as_str());
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(stats.snapshot().redirects_rewritten, 1);
}

#[tokio::test]
async fn test_html_links_rewritten() {
    let backend_port = spawn_mock_backend().await;
    let (proxy_port, stats) = spawn_proxy(create_test_config()).await;

    let url = proxied_url(
        proxy_port,
        KEY,
        &format!("http://127.0.0.1:{backend_port}/index"),
    );
    let resp = client().get(url).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-cache, no-store, must-revalidate"
    );
    let body = resp.text().await.unwrap();

    let about = proxied_url(
        proxy_port,
        KEY,
        &format!("http://127.0.0.1:{backend_port}/about"),
    );
    let logo = proxied_url(
        proxy_port,
        KEY,
        &format!("http://127.0.0.1:{backend_port}/logo.png"),
    );
    assert!(body.contains(&format!(r#"<a href="{about}">About</a>"#)));
    assert!(body.contains(&format!(r#"<img src="{logo}">"#)));
    assert!(body.contains(r##"<a href="#top">Top</a>"##));
    assert!(body.contains(r#"<a href="https://other.example.org/x">Other</a>"#));

    assert_eq!(stats.snapshot().links_rewritten, 2);
}

#[tokio::test]
async fn test_head_request_not_rewritten() {
    let backend_port = spawn_mock_backend().await;
    let (proxy_port, stats) = spawn_proxy(create_test_config()).await;

    let url = proxied_url(
        proxy_port,
        KEY,
        &format!("http://127.0.0.1:{backend_port}/index"),
    );
    let resp = client().head(url).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(stats.snapshot().links_rewritten, 0);
}

#[tokio::test]
async fn test_gzip_html_decoded_and_rewritten() {
    let backend_port = spawn_mock_backend().await;
    let (proxy_port, stats) = spawn_proxy(create_test_config()).await;

    let url = proxied_url(
        proxy_port,
        KEY,
        &format!("http://127.0.0.1:{backend_port}/gzip-index"),
    );
    let resp = client()
        .get(url)
        .header("Accept-Encoding", "gzip, deflate, br")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("content-encoding").is_none());
    let body = resp.text().await.unwrap();

    let about = proxied_url(
        proxy_port,
        KEY,
        &format!("http://127.0.0.1:{backend_port}/about"),
    );
    assert!(body.starts_with("<html><body>"));
    assert!(body.contains(&format!(r#"<a href="{about}">About</a>"#)));
    assert_eq!(stats.snapshot().links_rewritten, 2);
}

#[tokio::test]
async fn test_undecodable_html_passed_through() {
    let backend_port = spawn_mock_backend().await;
    let (proxy_port, stats) = spawn_proxy(create_test_config()).await;

    let url = proxied_url(
        proxy_port,
        KEY,
        &format!("http://127.0.0.1:{backend_port}/zstd-index"),
    );
    let resp = client()
        .get(url)
        .header("Accept-Encoding", "zstd")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-encoding").unwrap(), "zstd");
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), ZSTD_BODY);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.links_rewritten, 0);
    assert_eq!(snapshot.rewrites_skipped, 1);
}
