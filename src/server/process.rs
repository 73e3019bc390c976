use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::output::{self, OutputKind};

use super::models::{ErrorResponse, ProcessOutcome, ProcessRequest};
use super::state::ServerState;
use super::util::write_artifact;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        if output::is_invalid_input(&err) {
            ServerError::bad_request(err.to_string())
        } else {
            ServerError::internal(format!("{:#}", err))
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub(crate) fn process_request(
    state: &ServerState,
    request: ProcessRequest,
) -> Result<ProcessOutcome, ServerError> {
    let Some(image) = request.image.filter(|bytes| !bytes.is_empty()) else {
        return Err(ServerError::bad_request("No image uploaded!"));
    };
    let Some(text) = request.text else {
        return Err(ServerError::bad_request("text is required"));
    };
    let kind = OutputKind::from_form_value(request.output_type.as_deref());

    let rendered = output::render_output(&image, &text, kind, &state.style)?;
    let file_name = output::download_name(request.file_name.as_deref(), kind);

    if let Some(dir) = state.output_dir.as_deref() {
        let path = write_artifact(&rendered.bytes, kind.extension(), dir)?;
        info!(path = %path.display(), "stored artifact");
    }
    info!(
        file_name = %file_name,
        mime = rendered.mime(),
        width = rendered.width,
        height = rendered.height,
        "processed upload"
    );

    Ok(ProcessOutcome {
        file_name,
        mime: rendered.mime(),
        bytes: rendered.bytes,
    })
}
