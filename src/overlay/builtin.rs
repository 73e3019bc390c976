//! Built-in 5x7 bitmap font used when no outline font can be loaded.
//!
//! Glyphs are stored column-major, one byte per column, bit 0 being the top
//! row. Each cell is 6 columns wide (5 ink columns plus one blank) and 8 rows
//! tall, so at a font size of `s` pixels one cell unit is `s / 8` pixels.

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

use super::TextBounds;

const FIRST_CHAR: u32 = 0x20;
const CELL_COLUMNS: usize = 6;
const CELL_ROWS: f32 = 8.0;
const REPLACEMENT: char = '?';

#[rustfmt::skip]
const GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x01, 0x01], // F
    [0x3E, 0x41, 0x41, 0x51, 0x32], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x04, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x7F, 0x20, 0x18, 0x20, 0x7F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x03, 0x04, 0x78, 0x04, 0x03], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x00, 0x7F, 0x41, 0x41], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x41, 0x41, 0x7F, 0x00, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x08, 0x14, 0x54, 0x54, 0x3C], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x00, 0x7F, 0x10, 0x28, 0x44], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x02, 0x01, 0x02, 0x04, 0x02], // ~
];

fn glyph(ch: char) -> &'static [u8; 5] {
    let index = (ch as u32)
        .checked_sub(FIRST_CHAR)
        .filter(|index| (*index as usize) < GLYPHS.len())
        .unwrap_or(REPLACEMENT as u32 - FIRST_CHAR);
    &GLYPHS[index as usize]
}

/// Ink cells as `(column, row)` in cell units, where `column` already includes
/// the advance of the preceding characters.
fn ink_cells(text: &str) -> impl Iterator<Item = (usize, u32)> + '_ {
    text.chars()
        .filter(|ch| !ch.is_control())
        .enumerate()
        .flat_map(|(index, ch)| {
            glyph(ch)
                .iter()
                .enumerate()
                .flat_map(move |(column, bits)| {
                    (0..8u32)
                        .filter(move |row| (*bits >> *row) & 1 == 1)
                        .map(move |row| (index * CELL_COLUMNS + column, row))
                })
        })
}

fn unit(font_size: f32) -> f32 {
    font_size / CELL_ROWS
}

pub(super) fn measure(text: &str, font_size: f32) -> TextBounds {
    let unit = unit(font_size);
    let mut extent: Option<(usize, usize, u32, u32)> = None;
    for (column, row) in ink_cells(text) {
        extent = Some(match extent {
            Some((min_col, max_col, min_row, max_row)) => (
                min_col.min(column),
                max_col.max(column),
                min_row.min(row),
                max_row.max(row),
            ),
            None => (column, column, row, row),
        });
    }
    match extent {
        Some((min_col, max_col, min_row, max_row)) => TextBounds {
            left: min_col as f32 * unit,
            top: min_row as f32 * unit,
            right: (max_col + 1) as f32 * unit,
            bottom: (max_row + 1) as f32 * unit,
        },
        None => TextBounds::default(),
    }
}

pub(super) fn draw(
    pixmap: &mut Pixmap,
    text: &str,
    font_size: f32,
    origin: (f32, f32),
    paint: &Paint<'_>,
) {
    let unit = unit(font_size);
    let mut builder = PathBuilder::new();
    for (column, row) in ink_cells(text) {
        if let Some(cell) = Rect::from_xywh(
            origin.0 + column as f32 * unit,
            origin.1 + row as f32 * unit,
            unit,
            unit,
        ) {
            builder.push_rect(cell);
        }
    }
    if let Some(path) = builder.finish() {
        pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_hello_world_at_forty_pixels() {
        let bounds = measure("Hello World", 40.0);
        assert_eq!(bounds.left, 0.0);
        assert_eq!(bounds.top, 0.0);
        assert_eq!(bounds.right, 325.0);
        assert_eq!(bounds.bottom, 35.0);
    }

    #[test]
    fn whitespace_has_no_ink() {
        assert!(measure("   ", 40.0).is_empty());
        assert!(measure("", 40.0).is_empty());
    }

    #[test]
    fn unknown_characters_use_replacement_glyph() {
        assert_eq!(glyph('é'), glyph('?'));
        assert_eq!(measure("é", 16.0), measure("?", 16.0));
    }

    #[test]
    fn descenders_extend_the_bottom_edge() {
        let plain = measure("a", 8.0);
        let descender = measure("g", 8.0);
        assert!(descender.bottom >= plain.bottom);
    }
}
