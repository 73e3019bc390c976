use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Persists an artifact under `dir` with a unique name so concurrent requests
/// for the same upload never collide.
pub(crate) fn write_artifact(bytes: &[u8], extension: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let suffix = format!(".{}", extension);
    let file = tempfile::Builder::new()
        .prefix("image-caption-")
        .suffix(&suffix)
        .tempfile_in(dir)
        .with_context(|| format!("failed to create artifact in {}", dir.display()))?;
    std::fs::write(file.path(), bytes).with_context(|| "failed to write artifact")?;
    let path = file
        .into_temp_path()
        .keep()
        .with_context(|| "failed to persist artifact")?;
    Ok(path)
}

/// `attachment` disposition with an ASCII `filename` and, when needed, an
/// RFC 5987 `filename*` carrying the UTF-8 name.
pub(crate) fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|ch| {
            if (ch.is_ascii_graphic() && ch != '"' && ch != '\\') || ch == ' ' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if ascii == file_name {
        return format!("attachment; filename=\"{}\"", ascii);
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        percent_encode(file_name)
    )
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
