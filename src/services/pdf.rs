//! Minimal single-purpose PDF 1.4 writer
//!
//! Enough of the format to lay out one page with filled rectangles, lines,
//! WinAnsi text in standard or embedded TrueType fonts and JPEG images passed
//! through untouched (DCTDecode). Content streams are stored uncompressed.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use image::GenericImageView;

/// Points per centimetre
pub const POINTS_PER_CM: f32 = 72.0 / 2.54;

pub fn cm(value: f32) -> f32 {
    value * POINTS_PER_CM
}

/// Object number inside a [`PdfDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn reference(&self) -> String {
        format!("{} 0 R", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    fn components(&self) -> String {
        format!(
            "{:.3} {:.3} {:.3}",
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0
        )
    }
}

/// Object table of a document under construction
#[derive(Debug, Default)]
pub struct PdfDocument {
    objects: Vec<Option<Vec<u8>>>,
}

impl PdfDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an object number to be filled later with [`Self::set`]
    pub fn reserve(&mut self) -> ObjectId {
        self.objects.push(None);
        ObjectId(self.objects.len())
    }

    pub fn set(&mut self, id: ObjectId, body: impl Into<Vec<u8>>) {
        self.objects[id.0 - 1] = Some(body.into());
    }

    pub fn add(&mut self, body: impl Into<Vec<u8>>) -> ObjectId {
        let id = self.reserve();
        self.set(id, body);
        id
    }

    /// Adds a stream object; `dict` holds the entries besides `/Length`
    pub fn add_stream(&mut self, dict: &str, data: &[u8]) -> ObjectId {
        let mut body = format!("<< {} /Length {} >>\nstream\n", dict, data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.add(body)
    }

    /// Serializes the document with its cross-reference table
    pub fn finish(self, root: ObjectId) -> Result<Vec<u8>> {
        let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(self.objects.len());

        for (index, body) in self.objects.into_iter().enumerate() {
            let body = body.with_context(|| format!("PDF object {} was never written", index + 1))?;
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(&body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1);
        for offset in &offsets {
            let _ = write!(xref, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            root.reference(),
            xref_offset
        );
        out.extend_from_slice(xref.as_bytes());
        Ok(out)
    }
}

/// Encodes text as an escaped WinAnsi PDF string literal.
///
/// Characters outside Latin-1 are replaced with `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for c in text.chars() {
        let code = c as u32;
        let byte = if (0x20..=0x7E).contains(&code) || (0xA0..=0xFF).contains(&code) {
            code as u8
        } else {
            b'?'
        };
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    out
}

// ==================== Fonts ====================

/// Glyph advance widths for WinAnsi codes 32..=255, in 1/1000 em
#[derive(Debug, Clone)]
pub struct FontMetrics {
    widths: Vec<u16>,
}

impl FontMetrics {
    pub const FIRST_CHAR: u32 = 32;
    pub const LAST_CHAR: u32 = 255;

    /// Flat metrics used for the standard fonts
    pub fn uniform(width: u16) -> Self {
        Self {
            widths: vec![width; (Self::LAST_CHAR - Self::FIRST_CHAR + 1) as usize],
        }
    }

    fn width_of(&self, c: char) -> u16 {
        let code = c as u32;
        if (Self::FIRST_CHAR..=Self::LAST_CHAR).contains(&code) {
            self.widths[(code - Self::FIRST_CHAR) as usize]
        } else {
            self.widths[('?' as u32 - Self::FIRST_CHAR) as usize]
        }
    }

    /// Rendered width of `text` at `size` points
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.width_of(c) as u32).sum();
        units as f32 * size / 1000.0
    }

    fn widths_array(&self) -> String {
        let values: Vec<String> = self.widths.iter().map(u16::to_string).collect();
        format!("[{}]", values.join(" "))
    }
}

/// A font registered on the page
#[derive(Debug, Clone)]
pub struct PageFont {
    pub resource_name: String,
    pub object: ObjectId,
    pub metrics: FontMetrics,
}

/// Registers one of the 14 standard fonts
pub fn standard_font(doc: &mut PdfDocument, resource_name: &str, base_font: &str) -> PageFont {
    let object = doc.add(format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base_font
    ));
    PageFont {
        resource_name: resource_name.to_string(),
        object,
        // roughly the average advance of the serif faces
        metrics: FontMetrics::uniform(500),
    }
}

/// Embeds a TrueType font program
pub fn embed_truetype(doc: &mut PdfDocument, resource_name: &str, data: &[u8]) -> Result<PageFont> {
    let face = ttf_parser::Face::parse(data, 0).context("invalid TrueType font")?;
    let units = face.units_per_em().max(1) as f32;
    let scale = |v: f32| (v * 1000.0 / units).round() as i32;

    let widths = (FontMetrics::FIRST_CHAR..=FontMetrics::LAST_CHAR)
        .map(|code| {
            char::from_u32(code)
                .and_then(|c| face.glyph_index(c))
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .map(|advance| scale(advance as f32).max(0) as u16)
                .unwrap_or(0)
        })
        .collect();
    let metrics = FontMetrics { widths };

    let bbox = face.global_bounding_box();
    let ascent = scale(face.ascender() as f32);
    let descent = scale(face.descender() as f32);
    let base_font = "BrightMindCertificate";

    let file = doc.add_stream(&format!("/Length1 {}", data.len()), data);
    let descriptor = doc.add(format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags 32 /FontBBox [{} {} {} {}] \
         /ItalicAngle 0 /Ascent {} /Descent {} /CapHeight {} /StemV 80 /FontFile2 {} >>",
        base_font,
        scale(bbox.x_min as f32),
        scale(bbox.y_min as f32),
        scale(bbox.x_max as f32),
        scale(bbox.y_max as f32),
        ascent,
        descent,
        ascent,
        file.reference()
    ));
    let object = doc.add(format!(
        "<< /Type /Font /Subtype /TrueType /BaseFont /{} /FirstChar {} /LastChar {} \
         /Widths {} /FontDescriptor {} /Encoding /WinAnsiEncoding >>",
        base_font,
        FontMetrics::FIRST_CHAR,
        FontMetrics::LAST_CHAR,
        metrics.widths_array(),
        descriptor.reference()
    ));

    Ok(PageFont {
        resource_name: resource_name.to_string(),
        object,
        metrics,
    })
}

// ==================== Images ====================

#[derive(Debug, Clone)]
pub struct PageImage {
    pub resource_name: String,
    pub object: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Colour components declared by the JPEG frame header, and whether an Adobe
/// APP14 segment precedes it
fn jpeg_frame_info(jpeg: &[u8]) -> Option<(u8, bool)> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut adobe = false;
    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            return None;
        }
        let marker = jpeg[pos + 1];
        match marker {
            // fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // markers without a length
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }
        let length = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let segment = jpeg.get(pos + 4..pos + 2 + length)?;
        match marker {
            0xEE if segment.starts_with(b"Adobe") => adobe = true,
            0xC4 | 0xC8 | 0xCC => {}
            // SOF: precision, height, width, then the component count
            0xC0..=0xCF => return segment.get(5).map(|&components| (components, adobe)),
            0xDA | 0xD9 => return None,
            _ => {}
        }
        pos += 2 + length;
    }
    None
}

/// `/ColorSpace` entry (plus `/Decode` for inverted Adobe CMYK) for a JPEG
/// with `components` channels
fn jpeg_color_space(components: u8, adobe: bool) -> &'static str {
    match components {
        1 => "/DeviceGray",
        4 if adobe => "/DeviceCMYK /Decode [1 0 1 0 1 0 1 0]",
        4 => "/DeviceCMYK",
        _ => "/DeviceRGB",
    }
}

/// Embeds a JPEG as-is; the decoder is only used to validate it and read its
/// geometry
pub fn embed_jpeg(doc: &mut PdfDocument, resource_name: &str, jpeg: &[u8]) -> Result<PageImage> {
    let decoded = image::load_from_memory_with_format(jpeg, image::ImageFormat::Jpeg)
        .with_context(|| format!("image {} is not a readable JPEG", resource_name))?;
    let (width, height) = decoded.dimensions();
    // the decoder converts CMYK to RGB, so the header decides
    let (components, adobe) =
        jpeg_frame_info(jpeg).unwrap_or((decoded.color().channel_count(), false));
    let color_space = jpeg_color_space(components, adobe);

    let object = doc.add_stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
             /BitsPerComponent 8 /Filter /DCTDecode",
            width, height, color_space
        ),
        jpeg,
    );
    Ok(PageImage {
        resource_name: resource_name.to_string(),
        object,
        width,
        height,
    })
}

// ==================== Page content ====================

/// Drawing operators of one page, coordinates in points from the bottom-left
#[derive(Debug, Default)]
pub struct ContentStream {
    data: Vec<u8>,
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, op: &str) {
        self.data.extend_from_slice(op.as_bytes());
        self.data.push(b'\n');
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.push(&format!(
            "q {} rg {:.2} {:.2} {:.2} {:.2} re f Q",
            color.components(),
            x,
            y,
            width,
            height
        ));
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb) {
        self.push(&format!(
            "q {} RG {:.2} w {:.2} {:.2} m {:.2} {:.2} l S Q",
            color.components(),
            width,
            from.0,
            from.1,
            to.0,
            to.1
        ));
    }

    pub fn image(&mut self, image: &PageImage, x: f32, y: f32, width: f32, height: f32) {
        self.push(&format!(
            "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /{} Do Q",
            width, height, x, y, image.resource_name
        ));
    }

    pub fn text(&mut self, font: &PageFont, size: f32, x: f32, y: f32, color: Rgb, text: &str) {
        self.data.extend_from_slice(
            format!(
                "BT {} rg /{} {:.1} Tf {:.2} {:.2} Td ",
                color.components(),
                font.resource_name,
                size,
                x,
                y
            )
            .as_bytes(),
        );
        self.data.extend_from_slice(&encode_text(text));
        self.data.extend_from_slice(b" Tj ET\n");
    }

    /// Draws `text` horizontally centred on `center_x`
    pub fn centered_text(&mut self, font: &PageFont, size: f32, center_x: f32, y: f32, color: Rgb, text: &str) {
        let width = font.metrics.text_width(text, size);
        self.text(font, size, center_x - width / 2.0, y, color, text);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Writes a one-page document and returns its bytes
pub fn single_page(
    mut doc: PdfDocument,
    page_size: (f32, f32),
    fonts: &[&PageFont],
    images: &[&PageImage],
    content: ContentStream,
) -> Result<Vec<u8>> {
    let catalog = doc.reserve();
    let pages = doc.reserve();

    let font_entries: Vec<String> = fonts
        .iter()
        .map(|f| format!("/{} {}", f.resource_name, f.object.reference()))
        .collect();
    let image_entries: Vec<String> = images
        .iter()
        .map(|i| format!("/{} {}", i.resource_name, i.object.reference()))
        .collect();

    let contents = doc.add_stream("", &content.into_bytes());
    let page = doc.add(format!(
        "<< /Type /Page /Parent {} /MediaBox [0 0 {:.2} {:.2}] /Resources << /Font << {} >> /XObject << {} >> >> /Contents {} >>",
        pages.reference(),
        page_size.0,
        page_size.1,
        font_entries.join(" "),
        image_entries.join(" "),
        contents.reference()
    ));
    doc.set(
        pages,
        format!("<< /Type /Pages /Kids [{}] /Count 1 >>", page.reference()),
    );
    doc.set(
        catalog,
        format!("<< /Type /Catalog /Pages {} >>", pages.reference()),
    );
    doc.finish(catalog)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn words(values: &[i32]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|&v| (v as u16).to_be_bytes())
            .collect()
    }

    /// A TrueType font with glyphs 600 units wide for ASCII 32..=126 and
    /// no outlines
    pub(crate) fn truetype_fixture() -> Vec<u8> {
        let head = words(&[
            1, 0, 1, 0, 0, 0, 0x5F0F, 0x3CF5, // version, revision, checksum, magic
            0, 1000, // flags, unitsPerEm
            0, 0, 0, 0, 0, 0, 0, 0, // created, modified
            0, -200, 600, 800, // bbox
            0, 8, 2, 0, 0,
        ]);
        let hhea = words(&[
            1, 0, 800, -200, 0, 600, 0, 0, 600, 1, 0, 0, 0, 0, 0, 0, 0, 96,
        ]);
        let maxp = words(&[0, 0x5000, 96]);
        let hmtx = words(&[600, 0].repeat(96));
        // one format 4 segment mapping 0x20..=0x7E to glyphs 1..=95
        let cmap = words(&[
            0, 1, 3, 1, 0, 12, // header, Windows Unicode BMP record
            4, 32, 0, 4, 4, 1, 0, // format 4 header, two segments
            0x7E, 0xFFFF, 0, 0x20, 0xFFFF, -31, 1, 0, 0,
        ]);

        let tables: [(&[u8; 4], Vec<u8>); 5] = [
            (b"cmap", cmap),
            (b"head", head),
            (b"hhea", hhea),
            (b"hmtx", hmtx),
            (b"maxp", maxp),
        ];
        let mut font = words(&[1, 0, tables.len() as i32, 64, 2, 16]);
        let mut body = Vec::new();
        let mut offset = 12 + 16 * tables.len();
        for (tag, data) in &tables {
            font.extend_from_slice(*tag);
            font.extend_from_slice(&0u32.to_be_bytes());
            font.extend_from_slice(&(offset as u32).to_be_bytes());
            font.extend_from_slice(&(data.len() as u32).to_be_bytes());
            body.extend_from_slice(data);
            while body.len() % 4 != 0 {
                body.push(0);
            }
            offset = 12 + 16 * tables.len() + body.len();
        }
        font.extend_from_slice(&body);
        font
    }

    #[test]
    fn test_encode_text_escapes_and_latin1() {
        assert_eq!(encode_text("a(b)\\"), b"(a\\(b\\)\\\\)".to_vec());
        assert_eq!(encode_text("¡Sí!"), vec![b'(', 0xA1, b'S', 0xED, b'!', b')']);
        assert_eq!(encode_text("→"), b"(?)".to_vec());
    }

    #[test]
    fn test_uniform_metrics() {
        let metrics = FontMetrics::uniform(500);
        assert_eq!(metrics.text_width("abcd", 10.0), 20.0);
        assert_eq!(metrics.text_width("→", 10.0), 5.0);
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut doc = PdfDocument::new();
        let font = standard_font(&mut doc, "F1", "Helvetica");
        let mut content = ContentStream::new();
        content.text(&font, 12.0, 10.0, 10.0, Rgb::BLACK, "Hello");
        let bytes = single_page(doc, (200.0, 100.0), &[&font], &[], content).unwrap();

        let text = String::from_utf8_lossy(&bytes).into_owned();
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));

        let startxref: usize = text
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!(bytes[startxref..].starts_with(b"xref"));

        let table = std::str::from_utf8(&bytes[startxref..]).unwrap();
        let entries: Vec<usize> = table
            .lines()
            .skip(3)
            .take_while(|line| line.ends_with(" n "))
            .map(|line| line[..10].parse().unwrap())
            .collect();
        assert_eq!(entries.len(), 5);
        for (i, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", i + 1);
            assert!(bytes[*offset..].starts_with(expected.as_bytes()));
        }
    }

    #[test]
    fn test_unwritten_object_fails() {
        let mut doc = PdfDocument::new();
        let root = doc.reserve();
        assert!(doc.finish(root).is_err());
    }

    #[test]
    fn test_embedded_truetype_font() {
        let data = truetype_fixture();
        let mut doc = PdfDocument::new();
        let font = embed_truetype(&mut doc, "F3", &data).unwrap();
        assert_eq!(font.metrics.text_width("AB", 10.0), 12.0);
        assert_eq!(font.metrics.text_width("é", 10.0), 0.0);

        let bytes = single_page(doc, (200.0, 100.0), &[&font], &[], ContentStream::new()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains(&format!("/Length1 {}", data.len())));
        assert!(text.contains("/FontFile2 1 0 R"));
        assert!(text.contains("/Subtype /TrueType"));
        assert!(text.contains("/FontBBox [0 -200 600 800]"));
        assert!(text.contains("/Ascent 800 /Descent -200"));
        assert!(text.contains("/FirstChar 32 /LastChar 255 /Widths [600 600"));
    }

    #[test]
    fn test_broken_font_is_rejected() {
        let mut doc = PdfDocument::new();
        assert!(embed_truetype(&mut doc, "F3", b"not a font").is_err());
    }

    #[test]
    fn test_jpeg_frame_components() {
        let rgb = crate::services::certificate::tests::jpeg(4, 4);
        assert_eq!(jpeg_frame_info(&rgb).map(|(components, _)| components), Some(3));

        let segments: [&[u8]; 7] = [
            &[0xFF, 0xD8],
            &[0xFF, 0xEE, 0x00, 0x0E],
            b"Adobe",
            &[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x02],
            &[0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x04, 0x00, 0x04, 0x04],
            &[1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0, 4, 0x11, 0],
            &[0xFF, 0xD9],
        ];
        let cmyk = segments.concat();
        assert_eq!(jpeg_frame_info(&cmyk), Some((4, true)));
        assert_eq!(
            jpeg_color_space(4, true),
            "/DeviceCMYK /Decode [1 0 1 0 1 0 1 0]"
        );
        assert_eq!(jpeg_color_space(1, false), "/DeviceGray");
        assert_eq!(jpeg_frame_info(b"not a jpeg"), None);
    }
}
