use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::settings;

use super::models::ProcessRequest;
use super::process::{ServerError, process_request};
use super::state::ServerState;
use super::util::content_disposition;

const FORM_HTML: &str = include_str!("form.html");

pub async fn run_server(settings: settings::Settings, addr: Option<String>) -> Result<()> {
    let addr = addr.unwrap_or_else(|| settings.server_addr.clone());
    let app = build_router(&settings)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Resolves the overlay style once and wires the routes around it.
pub fn build_router(settings: &settings::Settings) -> Result<Router> {
    let style = settings.overlay_style()?;
    info!(font = style.font.family(), size = style.font_size, "overlay font ready");
    let state = Arc::new(ServerState {
        style,
        output_dir: settings.server_output_dir.as_deref().map(PathBuf::from),
    });
    Ok(Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/process", post(process))
        .layer(DefaultBodyLimit::max(settings.server_max_upload_bytes))
        .with_state(state))
}

async fn index() -> Html<&'static str> {
    Html(FORM_HTML)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn process(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> Result<Response, ServerError> {
    let request = read_form(&mut multipart).await?;
    let outcome = tokio::task::spawn_blocking(move || process_request(state.as_ref(), request))
        .await
        .map_err(|err| ServerError::internal(format!("server task failed: {}", err)))??;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, outcome.mime)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&outcome.file_name),
        )
        .body(Body::from(outcome.bytes))
        .map_err(|err| ServerError::internal(format!("failed to build response: {}", err)))
}

async fn read_form(multipart: &mut Multipart) -> Result<ProcessRequest, ServerError> {
    let mut request = ProcessRequest::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::bad_request(format!("invalid form data: {}", err)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                request.file_name = field.file_name().map(|name| name.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ServerError::bad_request(format!("failed to read image: {}", err)))?;
                request.image = Some(bytes.to_vec());
            }
            "text" | "output_type" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ServerError::bad_request(format!("failed to read {}: {}", name, err)))?;
                if name == "text" {
                    request.text = Some(value);
                } else {
                    request.output_type = Some(value);
                }
            }
            _ => {}
        }
    }
    Ok(request)
}
