use serde::Deserialize;

use super::{OverlayError, OverlayFont};

pub const DEFAULT_FONT_SIZE: f32 = 40.0;
pub(crate) const MIN_FONT_SIZE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl OverlayColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

/// What to do when the caption box does not fit inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the computed coordinates; the canvas clips whatever falls outside.
    #[default]
    Clip,
    /// Step the font size down until the box fits (or the minimum size is hit).
    #[serde(rename = "shrink")]
    ShrinkToFit,
}

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub font: OverlayFont,
    pub font_size: f32,
    pub text_color: OverlayColor,
    pub box_color: OverlayColor,
    pub box_alpha: u8,
    pub padding_x: f32,
    pub padding_y: f32,
    pub margin_bottom: f32,
    pub overflow: OverflowPolicy,
}

impl OverlayStyle {
    /// White 40px text on a 50% black box, 10/5px padding, 20px above the
    /// bottom edge.
    pub fn new(font: OverlayFont) -> Self {
        Self {
            font,
            font_size: DEFAULT_FONT_SIZE,
            text_color: OverlayColor::white(),
            box_color: OverlayColor::black(),
            box_alpha: 128,
            padding_x: 10.0,
            padding_y: 5.0,
            margin_bottom: 20.0,
            overflow: OverflowPolicy::Clip,
        }
    }
}

/// Parses `#RGB` or `#RRGGBB`.
pub fn parse_hex_color(value: &str) -> Result<OverlayColor, OverlayError> {
    let trimmed = value.trim();
    let hex = trimmed
        .strip_prefix('#')
        .ok_or_else(|| OverlayError::InvalidInput(format!("color must start with '#': {}", trimmed)))?;
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(OverlayError::InvalidInput(format!(
            "invalid hex color: {}",
            trimmed
        )));
    }
    let digit = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|part| u8::from_str_radix(part, 16).ok())
            .ok_or_else(|| OverlayError::InvalidInput(format!("invalid hex color: {}", trimmed)))
    };
    match hex.len() {
        3 => Ok(OverlayColor::new(
            digit(0..1)? * 17,
            digit(1..2)? * 17,
            digit(2..3)? * 17,
        )),
        6 => Ok(OverlayColor::new(digit(0..2)?, digit(2..4)?, digit(4..6)?)),
        _ => Err(OverlayError::InvalidInput(format!(
            "color must be #RGB or #RRGGBB: {}",
            trimmed
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(parse_hex_color("#fff").unwrap(), OverlayColor::white());
        assert_eq!(
            parse_hex_color(" #c40000 ").unwrap(),
            OverlayColor::new(0xc4, 0, 0)
        );
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(parse_hex_color("ffffff").is_err());
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
        assert!(parse_hex_color("#+f0000").is_err());
        assert!(parse_hex_color("#+ff").is_err());
        assert!(parse_hex_color("#-1f").is_err());
    }

    #[test]
    fn overflow_policy_reads_lowercase_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            overflow: OverflowPolicy,
        }
        let clip: Wrapper = toml::from_str("overflow = \"clip\"").unwrap();
        let shrink: Wrapper = toml::from_str("overflow = \"shrink\"").unwrap();
        assert_eq!(clip.overflow, OverflowPolicy::Clip);
        assert_eq!(shrink.overflow, OverflowPolicy::ShrinkToFit);
    }
}
