use std::{io::Cursor, net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use glaze::{AppState, BUILTIN_NAMES, router};
use http_body_util::BodyExt;
use image::{Rgba, RgbaImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

fn state_with_assets(assets_dir: &std::path::Path) -> AppState {
    AppState::new(assets_dir.to_path_buf(), Duration::from_secs(5)).unwrap()
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec(), content_type)
}

/// Minimal one-shot upstream: serves `bytes` to every HTTP GET.
async fn spawn_upstream(bytes: Vec<u8>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let bytes = bytes.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    bytes.len()
                );
                let _ = stream.write_all(header.as_bytes()).await;
                let _ = stream.write_all(&bytes).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

fn png_fixture() -> Vec<u8> {
    let img = RgbaImage::from_pixel(12, 9, Rgba([20, 120, 220, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn listing_contains_builtins_and_asset_stems() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("party.png"), b"stub").unwrap();

    let app = router(state_with_assets(dir.path()));
    let (status, body, _) = get(app, "/filter").await;
    assert_eq!(status, StatusCode::OK);

    let hints: Vec<String> = serde_json::from_slice(&body).unwrap();
    for builtin in BUILTIN_NAMES {
        let expected = format!("GET filter/{builtin}?<image:url>");
        assert!(hints.contains(&expected), "missing hint for {builtin}");
    }
    assert!(hints.contains(&"GET filter/party?<image:url>".to_string()));
}

#[tokio::test]
async fn missing_image_parameter_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_with_assets(dir.path()));
    let (status, body, _) = get(app, "/filter/blur").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("provide an image"));
}

#[tokio::test]
async fn unknown_filter_is_404_without_any_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_with_assets(dir.path()));
    // Port 9 (discard) would hang or refuse; resolution must fail first.
    let (status, body, _) =
        get(app, "/filter/doesnotexist?image=http://127.0.0.1:9/x.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8_lossy(&body).contains("filter not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn static_success_returns_png_with_filename() {
    let upstream = spawn_upstream(png_fixture()).await;
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_with_assets(dir.path()));

    let uri = format!("/filter/mirror?image=http://{upstream}/src.png");
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=\"filter.png\""
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let back = image::load_from_memory(&body).unwrap();
    assert_eq!((back.width(), back.height()), (12, 9));
}

#[tokio::test(flavor = "multi_thread")]
async fn non_image_upstream_body_is_400() {
    let upstream = spawn_upstream(b"<html>not an image</html>".to_vec()).await;
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_with_assets(dir.path()));

    let uri = format!("/filter/blur?image=http://{upstream}/x");
    let (status, body, _) = get(app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("invalid image"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_image_url_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_with_assets(dir.path()));
    // A port nothing listens on: connection refused surfaces as input error.
    let (status, _, _) = get(app, "/filter/blur?image=http://127.0.0.1:1/x.png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn overlay_success_composites_the_asset() {
    let upstream = spawn_upstream(png_fixture()).await;

    let dir = tempfile::tempdir().unwrap();
    let asset = RgbaImage::from_pixel(3, 3, Rgba([250, 10, 10, 255]));
    image::DynamicImage::ImageRgba8(asset)
        .save_with_format(dir.path().join("redwash.png"), image::ImageFormat::Png)
        .unwrap();

    let app = router(state_with_assets(dir.path()));
    let uri = format!("/filter/redwash?image=http://{upstream}/src.png");
    let (status, body, content_type) = get(app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));

    let back = image::load_from_memory(&body).unwrap().to_rgba8();
    assert_eq!(back.get_pixel(0, 0), &Rgba([250, 10, 10, 255]));
}
