//! Server-side provider against a local HTTP stub.

use feedback_snip::capture::{
    CaptureError, CaptureKind, CaptureProvider, CaptureRequest, ServerSideProvider, SpaceHint,
};
use feedback_snip::encode;
use image::{Rgba, RgbaImage};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve exactly one HTTP request with `status` and `body`, handing the
/// raw request back through the returned channel.
async fn serve_once(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        // Read headers, then as much body as Content-Length says.
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&raw).to_string());

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    (format!("http://{}/render", addr), rx)
}

fn request(kind: CaptureKind) -> CaptureRequest {
    CaptureRequest {
        kind,
        metrics: Default::default(),
        page_url: Some("https://shop.example/cart".to_string()),
    }
}

#[tokio::test]
async fn decodes_image_from_render_service() {
    let bitmap = RgbaImage::from_pixel(32, 24, Rgba([9, 8, 7, 255]));
    let data_url = encode::png_data_url(&encode::encode_png(&bitmap).unwrap());
    let body = serde_json::json!({ "image": data_url }).to_string();
    let (endpoint, seen) = serve_once("200 OK", body).await;

    let provider = ServerSideProvider::with_timeout(endpoint, Duration::from_secs(5));
    let raw = provider.capture(&request(CaptureKind::WholePage)).await.unwrap();

    assert_eq!((raw.pixel_width(), raw.pixel_height()), (32, 24));
    assert_eq!(raw.space_hint(), SpaceHint::Unknown);
    assert_eq!(raw.pixels(), &bitmap);

    let http = seen.await.unwrap();
    assert!(http.starts_with("POST /render"));
    assert!(http.contains(r#""url":"https://shop.example/cart""#));
    assert!(http.contains(r#""fullPage":true"#));
}

#[tokio::test]
async fn non_success_status_is_a_render_failure() {
    let (endpoint, _seen) = serve_once("503 Service Unavailable", "{}".to_string()).await;
    let provider = ServerSideProvider::with_timeout(endpoint, Duration::from_secs(5));
    let result = provider
        .capture(&request(CaptureKind::Area(
            feedback_snip::SelectionRect::new(0.0, 0.0, 10.0, 10.0).unwrap(),
        )))
        .await;
    assert!(matches!(result, Err(CaptureError::RenderFailure(_))));
}

#[tokio::test]
async fn garbage_image_is_a_render_failure() {
    let body = serde_json::json!({ "image": "data:image/png;base64,AAAA" }).to_string();
    let (endpoint, _seen) = serve_once("200 OK", body).await;
    let provider = ServerSideProvider::with_timeout(endpoint, Duration::from_secs(5));
    let result = provider.capture(&request(CaptureKind::WholePage)).await;
    assert!(matches!(result, Err(CaptureError::RenderFailure(_))));
}

#[tokio::test]
async fn unreachable_service_is_unsupported() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let provider = ServerSideProvider::with_timeout(
        format!("http://127.0.0.1:{}/render", port),
        Duration::from_secs(5),
    );
    let result = provider.capture(&request(CaptureKind::WholePage)).await;
    assert!(matches!(result, Err(CaptureError::Unsupported(_))));
}
