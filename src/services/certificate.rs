//! Course completion certificate
//!
//! Renders a single landscape page (28 x 21.6 cm) with a fixed layout: tinted
//! background, two corner images, a central emblem, the learner name over a
//! rule and the course title below it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::services::pdf::{self, cm, ContentStream, PageFont, PdfDocument, Rgb};

pub const PAGE_WIDTH_CM: f32 = 28.0;
pub const PAGE_HEIGHT_CM: f32 = 21.6;

const BACKGROUND: Rgb = Rgb(240, 248, 255);
const FOOTER_GREY: Rgb = Rgb(192, 192, 192);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequest {
    pub learner_name: String,
    pub course_title: String,
}

impl CertificateRequest {
    /// `Certificate_<course title>.pdf`
    pub fn file_name(&self) -> String {
        let title: String = self
            .course_title
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        format!("Certificate_{}.pdf", title)
    }
}

/// Template images (JPEG) and an optional TrueType font for the large lines
#[derive(Debug, Clone)]
pub struct CertificateAssets {
    pub corner_top_left: Vec<u8>,
    pub corner_bottom_right: Vec<u8>,
    pub emblem: Vec<u8>,
    pub font: Option<Vec<u8>>,
}

/// Fixed wording printed on every certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateTemplate {
    pub heading: String,
    pub subtitle: String,
    pub awarded_to: String,
    /// `{course}` is replaced with the course title
    pub completion: String,
    pub thanks: String,
    pub footer: String,
}

impl Default for CertificateTemplate {
    fn default() -> Self {
        Self {
            heading: "CERTIFICATE".into(),
            subtitle: "of learning".into(),
            awarded_to: "THIS CERTIFICATE IS AWARDED TO".into(),
            completion: "For successfully completing the course \"{course}\".".into(),
            thanks: "Thank you for your dedication and effort. Keep learning and improving!".into(),
            footer: "This certificate was generated automatically.".into(),
        }
    }
}

/// Page coordinates measured in cm from the top-left corner
fn x(value_cm: f32) -> f32 {
    cm(value_cm)
}

fn y(value_cm: f32) -> f32 {
    cm(PAGE_HEIGHT_CM - value_cm)
}

/// Builds the certificate PDF
pub fn render(
    request: &CertificateRequest,
    assets: &CertificateAssets,
    template: &CertificateTemplate,
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::new();

    let serif = pdf::standard_font(&mut doc, "F1", "Times-Roman");
    let serif_bold = pdf::standard_font(&mut doc, "F2", "Times-Bold");
    let display: PageFont = match &assets.font {
        Some(data) => pdf::embed_truetype(&mut doc, "F3", data)?,
        None => pdf::standard_font(&mut doc, "F3", "Times-Bold"),
    };

    let top_left = pdf::embed_jpeg(&mut doc, "Im1", &assets.corner_top_left)
        .context("top-left corner image")?;
    let bottom_right = pdf::embed_jpeg(&mut doc, "Im2", &assets.corner_bottom_right)
        .context("bottom-right corner image")?;
    let emblem = pdf::embed_jpeg(&mut doc, "Im3", &assets.emblem).context("emblem image")?;

    let mut page = ContentStream::new();
    page.fill_rect(0.0, 0.0, cm(PAGE_WIDTH_CM), cm(PAGE_HEIGHT_CM), BACKGROUND);

    // images are placed by their top-left corner
    page.image(&top_left, x(-1.0), y(-1.0 + 10.0), cm(10.0), cm(10.0));
    page.image(&bottom_right, x(19.0), y(13.0 + 10.0), cm(10.0), cm(10.0));
    page.image(&emblem, x(12.0), y(7.0 + 4.0), cm(4.0), cm(4.0));

    page.centered_text(&display, 70.0, x(14.0), y(4.5), Rgb::BLACK, &template.heading);
    page.centered_text(&display, 25.0, x(18.0), y(5.5), Rgb::BLACK, &template.subtitle);
    page.centered_text(&serif_bold, 18.0, x(14.0), y(13.0), Rgb::BLACK, &template.awarded_to);
    page.centered_text(&display, 65.0, x(14.0), y(15.5), Rgb::BLACK, request.learner_name.trim());
    page.line((x(6.0), y(16.0)), (x(22.0), y(16.0)), cm(0.1), Rgb::BLACK);

    let completion = template.completion.replace("{course}", request.course_title.trim());
    page.centered_text(&serif, 14.0, x(14.0), y(17.5), Rgb::BLACK, &completion);
    page.centered_text(&serif, 14.0, x(14.0), y(18.2), Rgb::BLACK, &template.thanks);
    page.centered_text(&serif, 14.0, x(14.0), y(19.5), FOOTER_GREY, &template.footer);

    log::info!(
        "rendered certificate for {} ({})",
        request.learner_name,
        request.course_title
    );

    pdf::single_page(
        doc,
        (cm(PAGE_WIDTH_CM), cm(PAGE_HEIGHT_CM)),
        &[&serif, &serif_bold, &display],
        &[&top_left, &bottom_right, &emblem],
        page,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 90, 200]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageOutputFormat::Jpeg(80))
            .unwrap();
        out.into_inner()
    }

    pub(crate) fn assets() -> CertificateAssets {
        CertificateAssets {
            corner_top_left: jpeg(8, 8),
            corner_bottom_right: jpeg(8, 8),
            emblem: jpeg(4, 4),
            font: None,
        }
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn test_single_page_with_name_and_title() {
        let request = CertificateRequest {
            learner_name: "Ana Lopez".into(),
            course_title: "Rust Basics".into(),
        };
        let bytes = render(&request, &assets(), &CertificateTemplate::default()).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert_eq!(count(&bytes, b"/Type /Page "), 1);
        assert_eq!(count(&bytes, b"/Count 1"), 1);
        assert_eq!(count(&bytes, b"/Subtype /Image"), 3);
        assert_eq!(count(&bytes, b"(Ana Lopez)"), 1);
        assert_eq!(
            count(&bytes, b"(For successfully completing the course \"Rust Basics\".)"),
            1
        );
        assert!(count(&bytes, b"/MediaBox [0 0 793.70 612.28]") == 1);
    }

    #[test]
    fn test_embedded_font_is_used_for_display_text() {
        let mut with_font = assets();
        with_font.font = Some(crate::services::pdf::tests::truetype_fixture());
        let request = CertificateRequest {
            learner_name: "Ana Lopez".into(),
            course_title: "Rust Basics".into(),
        };
        let bytes = render(&request, &with_font, &CertificateTemplate::default()).unwrap();

        assert_eq!(count(&bytes, b"/Subtype /TrueType"), 1);
        assert_eq!(count(&bytes, b"/FontFile2 "), 1);
        assert_eq!(count(&bytes, b"/BaseFont /Times-Bold"), 1);
        assert_eq!(count(&bytes, b"/Widths [600 600"), 1);
        assert_eq!(count(&bytes, b"(Ana Lopez)"), 1);
    }

    #[test]
    fn test_invalid_font_is_reported() {
        let mut broken = assets();
        broken.font = Some(b"not a font".to_vec());
        let request = CertificateRequest {
            learner_name: "Ana".into(),
            course_title: "Rust".into(),
        };
        let err = render(&request, &broken, &CertificateTemplate::default()).unwrap_err();
        assert!(err.to_string().contains("TrueType"));
    }

    #[test]
    fn test_invalid_image_is_reported() {
        let mut broken = assets();
        broken.emblem = b"not a jpeg".to_vec();
        let request = CertificateRequest {
            learner_name: "Ana".into(),
            course_title: "Rust".into(),
        };
        let err = render(&request, &broken, &CertificateTemplate::default()).unwrap_err();
        assert!(err.to_string().contains("emblem"));
    }

    #[test]
    fn test_file_name() {
        let request = CertificateRequest {
            learner_name: "Ana".into(),
            course_title: " Rust: Basics/1 ".into(),
        };
        assert_eq!(request.file_name(), "Certificate_Rust_ Basics_1.pdf");
    }
}
