//! Small PDF 1.4 writer for fixed-layout report pages.
//!
//! Only the base-14 Helvetica faces are used, with `WinAnsiEncoding`, so no font
//! data is embedded. Text is therefore limited to the single-byte Latin-1 range;
//! anything outside it is dropped by [`encode_latin1`]. Pages hold text runs and
//! straight rules, which is all the reports need.

use chrono::NaiveDateTime;

pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

const PRODUCER: &str = concat!("resultsd ", env!("CARGO_PKG_VERSION"));

// Glyph widths (1/1000 em) for bytes 0x20..=0x7E, from the Adobe core font metrics.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

// Used for the upper Latin-1 half, where most glyphs are accented letters.
const DEFAULT_WIDTH: u16 = 556;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Oblique];

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Oblique => "F3",
        }
    }

    fn base_name(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Oblique => "Helvetica-Oblique",
        }
    }

    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
            Font::Regular | Font::Oblique => &HELVETICA_WIDTHS,
        };
        match byte {
            0x20..=0x7E => table[(byte - 0x20) as usize],
            _ => DEFAULT_WIDTH,
        }
    }
}

/// Keeps printable characters of the single-byte Latin-1 range and drops the rest.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c as u32 {
            v @ (0x20..=0x7E | 0xA0..=0xFF) => Some(v as u8),
            _ => None,
        })
        .collect()
}

pub fn text_width(font: Font, size: f32, encoded: &[u8]) -> f32 {
    let units: u32 = encoded.iter().map(|b| font.glyph_width(*b) as u32).sum();
    units as f32 * size / 1000.0
}

pub struct Page {
    width: f32,
    height: f32,
    ops: Vec<u8>,
}

impl Page {
    pub fn a4() -> Self {
        Self {
            width: A4_WIDTH,
            height: A4_HEIGHT,
            ops: Vec::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        let encoded = encode_latin1(text);
        self.push_text(font, size, x, y, &encoded);
    }

    pub fn text_centered(&mut self, font: Font, size: f32, y: f32, text: &str) {
        let encoded = encode_latin1(text);
        let x = (self.width - text_width(font, size, &encoded)) / 2.0;
        self.push_text(font, size, x, y, &encoded);
    }

    /// Horizontal line from `x1` to `x2` at height `y`.
    pub fn rule(&mut self, x1: f32, x2: f32, y: f32, thickness: f32) {
        self.ops.extend_from_slice(
            format!("{thickness:.2} w {x1:.2} {y:.2} m {x2:.2} {y:.2} l S\n").as_bytes(),
        );
    }

    fn push_text(&mut self, font: Font, size: f32, x: f32, y: f32, encoded: &[u8]) {
        self.ops.extend_from_slice(
            format!("BT /{} {size:.1} Tf {x:.2} {y:.2} Td (", font.resource()).as_bytes(),
        );
        for &b in encoded {
            if matches!(b, b'(' | b')' | b'\\') {
                self.ops.push(b'\\');
            }
            self.ops.push(b);
        }
        self.ops.extend_from_slice(b") Tj ET\n");
    }
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub created: NaiveDateTime,
}

/// Serializes pages into a complete PDF file. The output depends only on the
/// arguments.
pub fn write_pdf(pages: &[Page], info: &DocumentInfo) -> Vec<u8> {
    // Fixed objects: 1 catalog, 2 page tree, 3..=5 fonts, 6 info. Each page adds
    // a page object and a content stream.
    let first_page_obj = 7usize;
    let mut objects: Vec<Vec<u8>> = Vec::new();

    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page_obj + 2 * i))
        .collect();
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .into_bytes(),
    );

    for font in Font::ALL {
        objects.push(
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_name()
            )
            .into_bytes(),
        );
    }

    let mut info_obj = b"<< /Title ".to_vec();
    push_literal(&mut info_obj, &encode_latin1(&info.title));
    info_obj.extend_from_slice(b" /Producer ");
    push_literal(&mut info_obj, PRODUCER.as_bytes());
    info_obj.extend_from_slice(
        format!(
            " /CreationDate (D:{}) >>",
            info.created.format("%Y%m%d%H%M%S")
        )
        .as_bytes(),
    );
    objects.push(info_obj);

    for (i, page) in pages.iter().enumerate() {
        let content_obj = first_page_obj + 2 * i + 1;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R /F3 5 0 R >> >> \
                 /Contents {} 0 R >>",
                page.width, page.height, content_obj
            )
            .into_bytes(),
        );

        let mut stream = format!("<< /Length {} >>\nstream\n", page.ops.len()).into_bytes();
        stream.extend_from_slice(&page.ops);
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets: Vec<usize> = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    out.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
    );
    for off in &offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 6 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

fn push_literal(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b')');
}
