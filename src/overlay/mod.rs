//! Caption overlay: measures a line of text, anchors it bottom-center on the
//! image, draws a translucent contrast box behind it and then the text.

mod builtin;
mod font;
mod render;
mod style;

use std::fmt;

use style::MIN_FONT_SIZE;

pub use font::{BUILTIN_FAMILY, OutlineFont, OverlayFont, resolve_overlay_font};
pub use render::render_overlay;
pub use style::{DEFAULT_FONT_SIZE, OverflowPolicy, OverlayColor, OverlayStyle, parse_hex_color};

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to prepare canvas: {0}")]
    Canvas(String),
}

/// Ink box of a measured string, in pixels, relative to the draw origin
/// (top-left of the line box, y growing downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextBounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextBounds {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub(crate) fn union(&self, other: &TextBounds) -> TextBounds {
        TextBounds {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Axis-aligned box given by its edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Where the caption lands on an image.
///
/// `text_x`/`text_y` is the top-left corner of the measured ink box; the box
/// is `text_width` x `text_height`. `rect` is that box grown by the style's
/// padding. Coordinates may be negative or exceed the image when the text is
/// larger than the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub font_size: f32,
    pub text_x: f32,
    pub text_y: f32,
    pub text_width: f32,
    pub text_height: f32,
    pub rect: BoxRect,
    origin: (f32, f32),
}

impl Placement {
    pub fn new(
        image_width: u32,
        image_height: u32,
        bounds: TextBounds,
        font_size: f32,
        style: &OverlayStyle,
    ) -> Self {
        let text_width = bounds.width().max(0.0);
        let text_height = bounds.height().max(0.0);
        let text_x = (image_width as f32 - text_width) / 2.0;
        let text_y = image_height as f32 - text_height - style.margin_bottom;
        let rect = BoxRect {
            left: text_x - style.padding_x,
            top: text_y - style.padding_y,
            right: text_x + text_width + style.padding_x,
            bottom: text_y + text_height + style.padding_y,
        };
        Self {
            font_size,
            text_x,
            text_y,
            text_width,
            text_height,
            rect,
            origin: (text_x - bounds.left, text_y - bounds.top),
        }
    }

    /// Pen position handed to the font so the ink box lands at
    /// `(text_x, text_y)`.
    pub fn origin(&self) -> (f32, f32) {
        self.origin
    }

    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.rect.left >= 0.0
            && self.rect.top >= 0.0
            && self.rect.right <= image_width as f32
            && self.rect.bottom <= image_height as f32
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={} text=({}, {}) {}x{} rect=[{}, {}, {}, {}]",
            self.font_size,
            self.text_x,
            self.text_y,
            self.text_width,
            self.text_height,
            self.rect.left,
            self.rect.top,
            self.rect.right,
            self.rect.bottom
        )
    }
}

/// Measures `text` and computes its placement on a `width` x `height` image,
/// applying the style's overflow policy.
pub fn layout_caption(text: &str, width: u32, height: u32, style: &OverlayStyle) -> Placement {
    let mut font_size = style.font_size;
    let mut bounds = style.font.measure(text, font_size);
    let mut placement = Placement::new(width, height, bounds, font_size, style);
    if style.overflow == OverflowPolicy::ShrinkToFit {
        while !bounds.is_empty()
            && !placement.fits_within(width, height)
            && font_size > MIN_FONT_SIZE
        {
            font_size = (font_size * 0.9).max(MIN_FONT_SIZE);
            bounds = style.font.measure(text, font_size);
            placement = Placement::new(width, height, bounds, font_size, style);
        }
    }
    placement
}
