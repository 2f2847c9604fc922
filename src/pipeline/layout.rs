//! Page layout for the PDF report: text shaping, wrapping and pagination.
//!
//! The report uses the standard Helvetica Type 1 font, which every PDF
//! viewer ships, so no font file is embedded. The price is the WinAnsi
//! character set: anything outside it is shown as `?`.
//!
//! [`PageLayout`] is a cursor that flows blocks down US Letter pages and
//! starts a new page when a block no longer fits above the bottom margin. It
//! emits raw content-stream operations; [`crate::pipeline::report`] wraps
//! them into a document.

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

/// US Letter width in points.
pub const PAGE_WIDTH: f32 = 612.0;
/// US Letter height in points.
pub const PAGE_HEIGHT: f32 = 792.0;
/// Margin on all four sides.
pub const MARGIN: f32 = 72.0;
/// Usable text width.
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
/// Resource name of the body font.
pub const FONT_NAME: &str = "F1";

const LINE_SPACING: f32 = 1.2;
const ASCENT: f32 = 0.9;

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Horizontal placement of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Map a character to its WinAnsiEncoding byte, `?` when unrepresentable.
pub fn win_ansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\t' => b' ',
        '\u{A0}'..='\u{FF}' => c as u8,
        '\u{20AC}' => 0x80,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        _ => b'?',
    }
}

/// Encode a line as WinAnsi bytes.
pub fn encode_line(line: &str) -> Vec<u8> {
    line.chars().map(win_ansi_byte).collect()
}

fn glyph_width(byte: u8) -> u16 {
    match byte {
        32..=126 => HELVETICA_WIDTHS[(byte - 32) as usize],
        0x91 | 0x92 => 222,
        0x93 | 0x94 => 333,
        0x95 => 350,
        0x85 | 0x97 | 0x99 => 1000,
        _ => 556,
    }
}

/// Rendered width of `text` at `size` points.
pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| u32::from(glyph_width(win_ansi_byte(c))))
        .sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap. Newlines start new paragraphs; blank lines are kept.
/// Words wider than `max_width` are broken between characters.
pub fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, size) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    let mut next = current.clone();
                    next.push(c);
                    if !current.is_empty() && text_width(&next, size) > max_width {
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    } else {
                        current = next;
                    }
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Scale `(width, height)` to fit inside `(box_w, box_h)`, keeping aspect ratio.
pub fn fit(width: u32, height: u32, box_w: f32, box_h: f32) -> (f32, f32) {
    if width == 0 || height == 0 {
        return (0.0, 0.0);
    }
    let (w, h) = (width as f32, height as f32);
    let scale = (box_w / w).min(box_h / h);
    (w * scale, h * scale)
}

fn line_height(size: f32) -> f32 {
    size * LINE_SPACING
}

/// A top-down cursor over a growing list of pages.
#[derive(Debug)]
pub struct PageLayout {
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl PageLayout {
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Number of pages started so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Distance of the cursor from the top of the current page.
    pub fn cursor(&self) -> f32 {
        PAGE_HEIGHT - self.y
    }

    fn at_page_top(&self) -> bool {
        self.y >= PAGE_HEIGHT - MARGIN
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.at_page_top() {
            self.new_page();
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Skip one blank line of the given font size.
    pub fn move_down(&mut self, size: f32) {
        self.y -= line_height(size);
    }

    /// Flow a wrapped text block.
    pub fn text(&mut self, text: &str, size: f32, align: Align) {
        for line in wrap_text(text, size, CONTENT_WIDTH) {
            let lh = line_height(size);
            self.ensure_space(lh);

            if !line.is_empty() {
                let x = match align {
                    Align::Left => MARGIN,
                    Align::Center => (PAGE_WIDTH - text_width(&line, size)) / 2.0,
                };
                let baseline = self.y - size * ASCENT;
                self.ops().extend([
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![FONT_NAME.into(), size.into()]),
                    Operation::new("Td", vec![x.into(), baseline.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(encode_line(&line), StringFormat::Literal)],
                    ),
                    Operation::new("ET", vec![]),
                ]);
            }
            self.y -= lh;
        }
    }

    /// Place an image XObject, horizontally centred, at the cursor.
    pub fn image(&mut self, name: &str, width: f32, height: f32) {
        self.ensure_space(height);
        let x = (PAGE_WIDTH - width) / 2.0;
        let bottom = self.y - height;
        self.ops().extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.0f32.into(),
                    0.0f32.into(),
                    height.into(),
                    x.into(),
                    bottom.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        self.y = bottom;
    }

    /// Content-stream operations, one vector per page.
    pub fn into_pages(self) -> Vec<Vec<Operation>> {
        self.pages
    }
}
