use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::overlay::{self, OverflowPolicy, OverlayStyle};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub overlay_font_path: Option<String>,
    pub overlay_font_families: Vec<String>,
    pub overlay_system_fonts: bool,
    pub overlay_font_size: f32,
    pub overlay_text_color: String,
    pub overlay_box_color: String,
    pub overlay_box_alpha: u8,
    pub overlay_overflow: OverflowPolicy,
    pub server_addr: String,
    pub server_output_dir: Option<String>,
    pub server_max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overlay_font_path: None,
            overlay_font_families: vec![
                "Arial".to_string(),
                "DejaVu Sans".to_string(),
                "Liberation Sans".to_string(),
                "sans-serif".to_string(),
            ],
            overlay_system_fonts: true,
            overlay_font_size: overlay::DEFAULT_FONT_SIZE,
            overlay_text_color: "#ffffff".to_string(),
            overlay_box_color: "#000000".to_string(),
            overlay_box_alpha: 128,
            overlay_overflow: OverflowPolicy::Clip,
            server_addr: "127.0.0.1:5000".to_string(),
            server_output_dir: None,
            server_max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    overlay: Option<OverlaySettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    font_path: Option<String>,
    font_families: Option<Vec<String>>,
    system_fonts: Option<bool>,
    font_size: Option<f32>,
    text_color: Option<String>,
    box_color: Option<String>,
    box_alpha: Option<u8>,
    overflow: Option<OverflowPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    output_dir: Option<String>,
    max_upload_bytes: Option<usize>,
}

/// Builds settings from the embedded defaults, then `./settings.toml`,
/// `./settings.local.toml`, the same two files under
/// `~/.image-caption-rust/`, and finally `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            settings.merge_file(&path)?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let parsed: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(overlay) = incoming.overlay {
            if let Some(path) = overlay.font_path {
                if !path.trim().is_empty() {
                    self.overlay_font_path = Some(path);
                }
            }
            if let Some(families) = overlay.font_families {
                self.overlay_font_families = families
                    .into_iter()
                    .filter(|family| !family.trim().is_empty())
                    .collect();
            }
            if let Some(enabled) = overlay.system_fonts {
                self.overlay_system_fonts = enabled;
            }
            if let Some(size) = overlay.font_size {
                if size > 0.0 {
                    self.overlay_font_size = size;
                }
            }
            if let Some(color) = overlay.text_color {
                if !color.trim().is_empty() {
                    self.overlay_text_color = color;
                }
            }
            if let Some(color) = overlay.box_color {
                if !color.trim().is_empty() {
                    self.overlay_box_color = color;
                }
            }
            if let Some(alpha) = overlay.box_alpha {
                self.overlay_box_alpha = alpha;
            }
            if let Some(policy) = overlay.overflow {
                self.overlay_overflow = policy;
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr;
                }
            }
            if let Some(dir) = server.output_dir {
                if !dir.trim().is_empty() {
                    self.server_output_dir = Some(dir);
                }
            }
            if let Some(limit) = server.max_upload_bytes {
                if limit > 0 {
                    self.server_max_upload_bytes = limit;
                }
            }
        }
    }

    /// Resolves the font (never fails, see [`overlay::resolve_overlay_font`])
    /// and parses the configured colors.
    pub fn overlay_style(&self) -> Result<OverlayStyle> {
        let families: Vec<&str> = self
            .overlay_font_families
            .iter()
            .map(|family| family.as_str())
            .collect();
        let font = overlay::resolve_overlay_font(
            self.overlay_font_path.as_deref().map(Path::new),
            &families,
            self.overlay_system_fonts,
        );
        let mut style = OverlayStyle::new(font);
        style.font_size = self.overlay_font_size;
        style.text_color = overlay::parse_hex_color(&self.overlay_text_color)
            .with_context(|| "invalid [overlay] text_color")?;
        style.box_color = overlay::parse_hex_color(&self.overlay_box_color)
            .with_context(|| "invalid [overlay] box_color")?;
        style.box_alpha = self.overlay_box_alpha;
        style.overflow = self.overlay_overflow;
        Ok(style)
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".image-caption-rust"))
        }
    })
}
