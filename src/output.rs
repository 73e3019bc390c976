use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::overlay::{self, OverlayError, OverlayStyle};

pub const PNG_MIME: &str = "image/png";
pub const PDF_MIME: &str = "application/pdf";

const FALLBACK_STEM: &str = "image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    #[default]
    Image,
    Pdf,
}

impl OutputKind {
    /// Reads the form's `output_type`. Anything other than `pdf` means image.
    pub fn from_form_value(value: Option<&str>) -> Self {
        match value.map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) if value == "pdf" => OutputKind::Pdf,
            _ => OutputKind::Image,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputKind::Image => PNG_MIME,
            OutputKind::Pdf => PDF_MIME,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::Image => "png",
            OutputKind::Pdf => "pdf",
        }
    }
}

#[derive(Debug)]
pub struct RenderedOutput {
    pub kind: OutputKind,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedOutput {
    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }
}

/// Decodes an uploaded image. Non-image payloads are rejected as invalid input.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, OverlayError> {
    if bytes.is_empty() {
        return Err(OverlayError::InvalidInput("image is empty".to_string()));
    }
    if let Some(kind) = infer::get(bytes) {
        if !kind.mime_type().starts_with("image/") {
            return Err(OverlayError::InvalidInput(format!(
                "unsupported upload type: {}",
                kind.mime_type()
            )));
        }
    }
    image::load_from_memory(bytes)
        .map_err(|err| OverlayError::InvalidInput(format!("failed to decode image: {}", err)))
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .with_context(|| "failed to encode png")?;
    Ok(bytes)
}

/// Wraps the image as the only content of a page sized to its pixel
/// dimensions, one pixel per point.
pub fn image_to_pdf(image: &RgbaImage) -> Result<Vec<u8>> {
    use printpdf::{Image, ImageTransform, Mm, PdfDocument};

    let png = encode_png(image)?;
    let decoded = printpdf::image_crate::load_from_memory(&png)
        .with_context(|| "failed to reload image for pdf")?;
    let flattened = printpdf::image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let (doc, page, layer) = PdfDocument::new(
        "caption",
        page_mm(image.width()),
        page_mm(image.height()),
        "Layer 1",
    );
    let current_layer = doc.get_page(page).get_layer(layer);
    let pdf_image = Image::from_dynamic_image(&flattened);
    let transform = ImageTransform {
        translate_x: Some(Mm(0.0)),
        translate_y: Some(Mm(0.0)),
        rotate: None,
        scale_x: Some(1.0),
        scale_y: Some(1.0),
        dpi: Some(72.0),
    };
    pdf_image.add_to_layer(current_layer, transform);

    let mut buffer = Vec::new();
    {
        let mut writer = std::io::BufWriter::new(&mut buffer);
        doc.save(&mut writer).with_context(|| "failed to write pdf")?;
    }
    Ok(buffer)
}

/// printpdf stores page sizes as `Pt(mm * 2.834646)` in f32.
const PT_PER_MM: f32 = 2.834_646;

/// Millimetre value whose conversion back to points lands on `px` points,
/// or as close as f32 allows. The nearest few floats around the quotient are
/// tried since the plain division is often one ulp off after the multiply.
fn page_mm(px: u32) -> printpdf::Mm {
    let target = px as f32;
    let guess = target / PT_PER_MM;
    let bits = guess.to_bits();
    let best = (bits.saturating_sub(4)..=bits.saturating_add(4))
        .map(f32::from_bits)
        .filter(|mm| mm.is_finite())
        .min_by(|a, b| {
            let error = |mm: &f32| (mm * PT_PER_MM - target).abs();
            error(a).total_cmp(&error(b))
        })
        .unwrap_or(guess);
    printpdf::Mm(best)
}

/// Decode, caption and encode in one step.
pub fn render_output(
    image_bytes: &[u8],
    text: &str,
    kind: OutputKind,
    style: &OverlayStyle,
) -> Result<RenderedOutput> {
    let image = decode_image(image_bytes)?;
    let rendered = overlay::render_overlay(image, text, style)?;
    let (width, height) = rendered.dimensions();
    let bytes = match kind {
        OutputKind::Image => encode_png(&rendered)?,
        OutputKind::Pdf => image_to_pdf(&rendered)?,
    };
    debug!(
        width,
        height,
        mime = kind.mime(),
        size = bytes.len(),
        "rendered output"
    );
    Ok(RenderedOutput {
        kind,
        bytes,
        width,
        height,
    })
}

/// File name offered to the client: the upload's stem with the output
/// extension.
pub fn download_name(upload_name: Option<&str>, kind: OutputKind) -> String {
    let stem = upload_name
        .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name))
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .map(sanitize_stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string());
    format!("{}.{}", stem, kind.extension())
}

fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ' ') {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim()
        .trim_matches('.')
        .to_string()
}

/// True when the error came from bad input rather than a failure on our side.
pub fn is_invalid_input(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<OverlayError>(),
        Some(OverlayError::InvalidInput(_))
    )
}

pub fn default_output_path(input: &Path, kind: OutputKind) -> Result<std::path::PathBuf> {
    let name = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("input path has no file name: {}", input.display()))?;
    let file_name = download_name(Some(name), kind);
    let candidate = input.with_file_name(&file_name);
    if candidate == input {
        return Ok(input.with_file_name(format!("captioned-{}", file_name)));
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayFont;
    use image::Rgba;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([30, 60, 90, 255]));
        encode_png(&image).expect("encode sample")
    }

    #[test]
    fn output_kind_defaults_to_image() {
        assert_eq!(OutputKind::from_form_value(None), OutputKind::Image);
        assert_eq!(OutputKind::from_form_value(Some("image")), OutputKind::Image);
        assert_eq!(OutputKind::from_form_value(Some("gif")), OutputKind::Image);
        assert_eq!(OutputKind::from_form_value(Some(" PDF ")), OutputKind::Pdf);
    }

    #[test]
    fn download_name_uses_upload_stem() {
        assert_eq!(
            download_name(Some("holiday.jpg"), OutputKind::Image),
            "holiday.png"
        );
        assert_eq!(
            download_name(Some("holiday.jpg"), OutputKind::Pdf),
            "holiday.pdf"
        );
        assert_eq!(
            download_name(Some("C:\\photos\\beach.webp"), OutputKind::Pdf),
            "beach.pdf"
        );
        assert_eq!(
            download_name(Some("we\"ird\r\n.png"), OutputKind::Image),
            "we_ird__.png"
        );
        assert_eq!(download_name(None, OutputKind::Image), "image.png");
        assert_eq!(download_name(Some(""), OutputKind::Pdf), "image.pdf");
    }

    #[test]
    fn decode_rejects_non_images() {
        assert!(matches!(
            decode_image(b""),
            Err(OverlayError::InvalidInput(_))
        ));
        assert!(matches!(
            decode_image(b"%PDF-1.4 not an image"),
            Err(OverlayError::InvalidInput(_))
        ));
        assert!(matches!(
            decode_image(b"plain text"),
            Err(OverlayError::InvalidInput(_))
        ));
    }

    #[test]
    fn png_output_round_trips_dimensions() {
        let style = OverlayStyle::new(OverlayFont::builtin());
        let output = render_output(&sample_png(160, 90), "Hi", OutputKind::Image, &style)
            .expect("render png");
        assert_eq!(output.mime(), PNG_MIME);
        let decoded = image::load_from_memory(&output.bytes).expect("decode output");
        assert_eq!((decoded.width(), decoded.height()), (160, 90));
    }

    #[test]
    fn pdf_output_is_a_pdf_document() {
        let style = OverlayStyle::new(OverlayFont::builtin());
        let output = render_output(&sample_png(160, 90), "Hi", OutputKind::Pdf, &style)
            .expect("render pdf");
        assert_eq!(output.mime(), PDF_MIME);
        assert!(output.bytes.starts_with(b"%PDF-"));
        assert_eq!((output.width, output.height), (160, 90));
    }

    fn media_box(pdf: &[u8]) -> Vec<f32> {
        let doc = printpdf::lopdf::Document::load_mem(pdf).expect("parse pdf");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let page = doc.get_dictionary(page_id).expect("page dictionary");
        page.get(b"MediaBox")
            .and_then(|value| value.as_array())
            .expect("media box")
            .iter()
            .map(|value| value.as_float().expect("numeric media box entry"))
            .collect()
    }

    #[test]
    fn pdf_page_matches_image_size_in_points() {
        let style = OverlayStyle::new(OverlayFont::builtin());
        for (width, height) in [(160, 90), (800, 600), (1, 1), (1024, 768)] {
            let output = render_output(&sample_png(width, height), "Hi", OutputKind::Pdf, &style)
                .expect("render pdf");
            let bounds = media_box(&output.bytes);
            let expected = [0.0, 0.0, width as f32, height as f32];
            assert_eq!(bounds.len(), 4);
            for (got, want) in bounds.iter().zip(expected) {
                assert!((got - want).abs() < 0.01, "media box {:?} for {}x{}", bounds, width, height);
            }
        }
    }

    #[test]
    fn page_size_conversion_lands_on_whole_points() {
        for px in [1u32, 90, 160, 600, 800, 3024, 4032] {
            let mm = page_mm(px);
            assert!((mm.0 * PT_PER_MM - px as f32).abs() <= px as f32 * f32::EPSILON);
        }
    }

    #[test]
    fn invalid_upload_is_classified_as_input_error() {
        let style = OverlayStyle::new(OverlayFont::builtin());
        let err = render_output(b"nope", "Hi", OutputKind::Image, &style).unwrap_err();
        assert!(is_invalid_input(&err));
    }

    #[test]
    fn default_output_path_sits_next_to_input() {
        let path = default_output_path(Path::new("/tmp/in/photo.jpg"), OutputKind::Pdf).unwrap();
        assert_eq!(path, Path::new("/tmp/in/photo.pdf"));
        let path = default_output_path(Path::new("/tmp/in/photo.png"), OutputKind::Image).unwrap();
        assert_eq!(path, Path::new("/tmp/in/captioned-photo.png"));
    }
}
