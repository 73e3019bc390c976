use image::{DynamicImage, Rgba, RgbaImage};
use tiny_skia::{ColorU8, Paint, Pixmap, Rect, Transform};
use tracing::debug;

use super::{OverlayError, OverlayStyle, Placement, layout_caption};

/// Draws `text` bottom-center on `image` over a translucent box.
///
/// The output always has the input's dimensions. Empty or whitespace-only
/// text leaves the pixels untouched.
pub fn render_overlay(
    image: DynamicImage,
    text: &str,
    style: &OverlayStyle,
) -> Result<RgbaImage, OverlayError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(OverlayError::InvalidInput(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }
    let mut rgba = image.into_rgba8();
    let placement = layout_caption(text, width, height, style);
    if placement.text_width <= 0.0 || placement.text_height <= 0.0 {
        debug!("caption has no visible glyphs, leaving image untouched");
        return Ok(rgba);
    }
    debug!(
        font = style.font.family(),
        %placement,
        "placing caption"
    );

    let base = to_pixmap(&rgba)?;
    let mut pixmap = base.clone();
    fill_box(&mut pixmap, &placement, style);

    let mut paint = Paint::default();
    paint.set_color_rgba8(style.text_color.r, style.text_color.g, style.text_color.b, 255);
    paint.anti_alias = !style.font.is_builtin();
    style.font.draw(
        &mut pixmap,
        text,
        placement.font_size,
        placement.origin(),
        &paint,
    );

    copy_drawn_pixels(&mut rgba, &base, &pixmap);
    Ok(rgba)
}

fn fill_box(pixmap: &mut Pixmap, placement: &Placement, style: &OverlayStyle) {
    let rect = placement.rect;
    let Some(rect) = Rect::from_ltrb(rect.left, rect.top, rect.right, rect.bottom) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(
        style.box_color.r,
        style.box_color.g,
        style.box_color.b,
        style.box_alpha,
    );
    paint.anti_alias = false;
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}

fn to_pixmap(image: &RgbaImage) -> Result<Pixmap, OverlayError> {
    let mut pixmap = Pixmap::new(image.width(), image.height()).ok_or_else(|| {
        OverlayError::Canvas(format!(
            "cannot allocate {}x{} canvas",
            image.width(),
            image.height()
        ))
    })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let Rgba([r, g, b, a]) = *src;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Writes back only the pixels the box or glyph draws changed. The
/// premultiplied round trip is lossy for translucent pixels, so untouched
/// ones keep their original bytes.
fn copy_drawn_pixels(image: &mut RgbaImage, base: &Pixmap, drawn: &Pixmap) {
    let changed = base.pixels().iter().zip(drawn.pixels());
    for (dst, (before, after)) in image.pixels_mut().zip(changed) {
        if before == after {
            continue;
        }
        let color = after.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
}
