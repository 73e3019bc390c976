use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod logging;
pub mod output;
pub mod overlay;
pub mod server;
pub mod settings;

pub use output::{OutputKind, RenderedOutput, render_output};
pub use overlay::{OverlayError, OverlayFont, OverlayStyle, render_overlay};

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub image: PathBuf,
    pub text: String,
    pub output_kind: OutputKind,
    pub out_path: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
}

/// Captions a single file from disk and writes the result, returning the
/// path written.
pub fn run_render(config: RenderConfig) -> Result<PathBuf> {
    let settings = settings::load_settings(config.settings_path.as_deref())?;
    let style = settings.overlay_style()?;
    let bytes = std::fs::read(&config.image)
        .with_context(|| format!("failed to read image: {}", config.image.display()))?;
    let rendered = output::render_output(&bytes, &config.text, config.output_kind, &style)
        .with_context(|| format!("failed to caption {}", config.image.display()))?;
    let out_path = match config.out_path {
        Some(path) => path,
        None => output::default_output_path(&config.image, config.output_kind)?,
    };
    write_output(&out_path, &rendered.bytes)?;
    info!(
        path = %out_path.display(),
        font = style.font.family(),
        width = rendered.width,
        height = rendered.height,
        "wrote output"
    );
    Ok(out_path)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("failed to write: {}", path.display()))
}
