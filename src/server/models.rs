use serde::Serialize;

/// Fields collected from the `/process` multipart form.
#[derive(Debug, Default)]
pub(crate) struct ProcessRequest {
    pub(crate) image: Option<Vec<u8>>,
    pub(crate) file_name: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) output_type: Option<String>,
}

#[derive(Debug)]
pub(crate) struct ProcessOutcome {
    pub(crate) file_name: String,
    pub(crate) mime: &'static str,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
