use image::{Rgba, RgbaImage};
use image_caption_rust::settings::Settings;
use reqwest::multipart::{Form, Part};
use std::io::Cursor;
use tempfile::tempdir;

async fn spawn_server(settings: Settings) -> String {
    let app = image_caption_rust::server::build_router(&settings).expect("router");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{}", addr)
}

fn test_settings() -> Settings {
    Settings {
        overlay_system_fonts: false,
        ..Settings::default()
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([250, 250, 250, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn upload_form(output_type: &str) -> Form {
    let part = Part::bytes(png_bytes(400, 300))
        .file_name("holiday.png")
        .mime_str("image/png")
        .expect("mime");
    Form::new()
        .part("image", part)
        .text("text", "Hello World")
        .text("output_type", output_type.to_string())
}

#[tokio::test]
async fn serves_upload_form_and_health() {
    let base = spawn_server(test_settings()).await;
    let client = reqwest::Client::new();

    let form = client.get(&base).send().await.expect("index");
    assert_eq!(form.status(), 200);
    let html = form.text().await.expect("html");
    assert!(html.contains("action=\"/process\""));
    assert!(html.contains("name=\"output_type\""));

    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("health")
        .json()
        .await
        .expect("json");
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn process_returns_captioned_png() {
    let base = spawn_server(test_settings()).await;
    let response = reqwest::Client::new()
        .post(format!("{}/process", base))
        .multipart(upload_form("image"))
        .send()
        .await
        .expect("process");

    assert_eq!(response.status(), 200);
    let headers = response.headers().clone();
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"holiday.png\""
    );
    let body = response.bytes().await.expect("body");
    let image = image::load_from_memory(&body).expect("decode");
    assert_eq!((image.width(), image.height()), (400, 300));
    // Padding strip of the contrast box, just above the glyphs.
    let shaded = image.to_rgba8();
    let padding = shaded.get_pixel(200, 242);
    assert!(padding[0] < 200, "got {:?}", padding);
}

#[tokio::test]
async fn process_returns_pdf_when_requested() {
    let dir = tempdir().expect("tempdir");
    let settings = Settings {
        server_output_dir: Some(dir.path().to_string_lossy().to_string()),
        ..test_settings()
    };
    let base = spawn_server(settings).await;
    let response = reqwest::Client::new()
        .post(format!("{}/process", base))
        .multipart(upload_form("pdf"))
        .send()
        .await
        .expect("process");

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    let body = response.bytes().await.expect("body");
    assert!(body.starts_with(b"%PDF-"));

    let stored: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read output dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].extension().and_then(|ext| ext.to_str()),
        Some("pdf")
    );
}

#[tokio::test]
async fn process_without_image_is_rejected() {
    let base = spawn_server(test_settings()).await;
    let response = reqwest::Client::new()
        .post(format!("{}/process", base))
        .multipart(Form::new().text("text", "Hello"))
        .send()
        .await
        .expect("process");

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["error"], "No image uploaded!");
}
