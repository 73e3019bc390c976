use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use tracing::{debug, warn};
use ttf_parser::{Face, GlyphId, OutlineBuilder, name_id};
use usvg::fontdb;

use super::{TextBounds, builtin};

pub const BUILTIN_FAMILY: &str = "builtin-5x7";

/// A parsed TrueType/OpenType face kept as raw bytes; the `Face` is re-parsed
/// on use because it borrows from the data.
#[derive(Clone)]
pub struct OutlineFont {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    family: Option<String>,
}

impl fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineFont")
            .field("family", &self.family)
            .field("face_index", &self.face_index)
            .field("units_per_em", &self.units_per_em)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl OutlineFont {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }

    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em.max(1) as f32
    }

    fn measure(&self, text: &str, font_size: f32) -> TextBounds {
        let Some(face) = self.face() else {
            return TextBounds::default();
        };
        let scale = self.scale(font_size);
        let ascent = self.ascender as f32 * scale;
        let mut pen = 0.0f32;
        let mut bounds: Option<TextBounds> = None;
        for ch in text.chars().filter(|ch| !ch.is_control()) {
            let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
            if let Some(rect) = face.glyph_bounding_box(glyph) {
                let glyph_bounds = TextBounds {
                    left: pen + rect.x_min as f32 * scale,
                    top: ascent - rect.y_max as f32 * scale,
                    right: pen + rect.x_max as f32 * scale,
                    bottom: ascent - rect.y_min as f32 * scale,
                };
                bounds = Some(match bounds {
                    Some(existing) => existing.union(&glyph_bounds),
                    None => glyph_bounds,
                });
            }
            pen += face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
        }
        bounds.unwrap_or_default()
    }

    fn draw(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        font_size: f32,
        origin: (f32, f32),
        paint: &Paint<'_>,
    ) {
        let Some(face) = self.face() else {
            return;
        };
        let scale = self.scale(font_size);
        let mut sink = GlyphPath {
            builder: PathBuilder::new(),
            x: origin.0,
            baseline: origin.1 + self.ascender as f32 * scale,
            scale,
        };
        let mut pen = 0.0f32;
        for ch in text.chars().filter(|ch| !ch.is_control()) {
            let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
            sink.x = origin.0 + pen;
            face.outline_glyph(glyph, &mut sink);
            pen += face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
        }
        if let Some(path) = sink.builder.finish() {
            pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

struct GlyphPath {
    builder: PathBuilder,
    x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphPath {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPath {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Font handle used by the renderer. Always valid: when nothing else can be
/// loaded the built-in bitmap font is used.
#[derive(Debug, Clone)]
pub enum OverlayFont {
    Outline(OutlineFont),
    Builtin,
}

impl OverlayFont {
    pub fn builtin() -> Self {
        OverlayFont::Builtin
    }

    pub fn family(&self) -> &str {
        match self {
            OverlayFont::Outline(font) => font.family().unwrap_or("unknown"),
            OverlayFont::Builtin => BUILTIN_FAMILY,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, OverlayFont::Builtin)
    }

    /// Ink bounds of `text` relative to the draw origin (top of the line box).
    pub fn measure(&self, text: &str, font_size: f32) -> TextBounds {
        match self {
            OverlayFont::Outline(font) => font.measure(text, font_size),
            OverlayFont::Builtin => builtin::measure(text, font_size),
        }
    }

    pub(crate) fn draw(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        font_size: f32,
        origin: (f32, f32),
        paint: &Paint<'_>,
    ) {
        match self {
            OverlayFont::Outline(font) => font.draw(pixmap, text, font_size, origin, paint),
            OverlayFont::Builtin => builtin::draw(pixmap, text, font_size, origin, paint),
        }
    }
}

/// Loads the overlay font, falling back from the explicit file to the system
/// families in order, and finally to the built-in font. Never fails.
pub fn resolve_overlay_font(
    font_path: Option<&Path>,
    families: &[&str],
    use_system_fonts: bool,
) -> OverlayFont {
    if let Some(path) = font_path {
        match load_font_file(path) {
            Ok(font) => {
                debug!(path = %path.display(), family = ?font.family(), "loaded overlay font");
                return OverlayFont::Outline(font);
            }
            Err(err) => warn!("font unavailable, trying fallbacks: {:#}", err),
        }
    }

    if use_system_fonts && !families.is_empty() {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for family in families {
            match load_font_family(&db, family) {
                Ok(font) => {
                    debug!(requested = %family, family = ?font.family(), "loaded system font");
                    return OverlayFont::Outline(font);
                }
                Err(err) => debug!("{:#}", err),
            }
        }
    }

    warn!("no overlay font available, using {}", BUILTIN_FAMILY);
    OverlayFont::Builtin
}

fn load_font_file(path: &Path) -> Result<OutlineFont> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_outline_from_data(data, None)
        .with_context(|| format!("failed to parse font: {}", path.display()))
}

fn load_font_family(db: &fontdb::Database, family: &str) -> Result<OutlineFont> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    load_outline_from_data(data, Some(face_index))
}

fn load_outline_from_data(data: Vec<u8>, face_index: Option<u32>) -> Result<OutlineFont> {
    let candidates = match face_index {
        Some(index) => index..index + 1,
        None => 0..ttf_parser::fonts_in_collection(&data).unwrap_or(1),
    };
    for index in candidates {
        let Ok(face) = Face::parse(&data, index) else {
            continue;
        };
        let units_per_em = face.units_per_em().max(1);
        let ascender = face.ascender();
        let family = extract_family_name(&face);
        return Ok(OutlineFont {
            data: Arc::new(data),
            face_index: index,
            units_per_em,
            ascender,
            family,
        });
    }
    Err(anyhow!("failed to parse font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_font_file_falls_back_without_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("arial.ttf");
        let font = resolve_overlay_font(Some(&path), &[], false);
        assert!(font.is_builtin());
        assert_eq!(font.family(), BUILTIN_FAMILY);
    }

    #[test]
    fn corrupt_font_file_falls_back_without_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").expect("write font");
        let font = resolve_overlay_font(Some(&path), &[], false);
        assert!(font.is_builtin());
    }

    #[test]
    fn unknown_system_family_never_fails() {
        let font = resolve_overlay_font(None, &["No Such Family 1f3a"], true);
        let bounds = font.measure("Hello", 40.0);
        assert!(bounds.width() > 0.0);
        assert!(bounds.height() > 0.0);
    }

    #[test]
    fn garbage_bytes_are_not_a_font() {
        assert!(load_outline_from_data(vec![0u8; 16], None).is_err());
        assert!(load_outline_from_data(Vec::new(), Some(0)).is_err());
    }
}
