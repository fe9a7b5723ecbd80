//! Text sanitizing, wrapping and pagination for the conversion bridge.
//!
//! Output is drawn with the standard Helvetica font in WinAnsi encoding, so
//! every character is first mapped into that repertoire. Line widths are
//! measured with Helvetica's AFM glyph widths.

use serde::{Deserialize, Serialize};

/// Form feed; forces a page break.
pub const PAGE_BREAK: char = '\u{000C}';

/// Lines at most this long that contain no lower-case letters are titles.
pub const TITLE_MAX_CHARS: usize = 50;

/// Page geometry and font sizes, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    /// Page width (A4).
    pub width: f32,
    /// Page height (A4).
    pub height: f32,
    /// Margin on every side.
    pub margin: f32,
    /// Body font size.
    pub font_size: f32,
    /// Title font size.
    pub title_size: f32,
    /// Baseline-to-baseline distance.
    pub line_height: f32,
    /// Footer font size.
    pub footer_size: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin: 50.0,
            font_size: 10.0,
            title_size: 12.0,
            line_height: 14.0,
            footer_size: 8.0,
        }
    }
}

impl PageLayout {
    /// Width available for text.
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Lines that fit between the margins.
    pub fn lines_per_page(&self) -> usize {
        let usable = self.height - 2.0 * self.margin;
        ((usable / self.line_height).floor() as usize).max(1)
    }
}

/// How a line is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// Regular text.
    Body,
    /// Bold, larger text.
    Title,
}

/// One laid-out line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLine {
    /// Sanitized text.
    pub text: String,
    /// Style.
    pub style: LineStyle,
}

impl PageLine {
    /// Body line.
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: LineStyle::Body,
        }
    }

    /// Title line.
    pub fn title(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: LineStyle::Title,
        }
    }
}

/// WinAnsi byte for `c`, if the encoding has one.
pub fn winansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => {
            let byte = match c {
                '€' => 0x80,
                '‚' => 0x82,
                'ƒ' => 0x83,
                '„' => 0x84,
                '…' => 0x85,
                '†' => 0x86,
                '‡' => 0x87,
                'ˆ' => 0x88,
                '‰' => 0x89,
                'Š' => 0x8A,
                '‹' => 0x8B,
                'Œ' => 0x8C,
                'Ž' => 0x8E,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '˜' => 0x98,
                '™' => 0x99,
                'š' => 0x9A,
                '›' => 0x9B,
                'œ' => 0x9C,
                'ž' => 0x9E,
                'Ÿ' => 0x9F,
                _ => return None,
            };
            Some(byte)
        }
    }
}

/// Encode sanitized text as WinAnsi bytes; unknown characters become `?`.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| winansi_byte(c).unwrap_or(b'?'))
        .collect()
}

/// Map look-alike punctuation onto characters WinAnsi has.
fn fold_punctuation(c: char) -> Option<&'static str> {
    let folded = match c {
        '\u{00A0}' | '\u{2002}' | '\u{2003}' | '\u{2009}' | '\u{202F}' => " ",
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2212}' => "-",
        '\u{2015}' => "—",
        '\u{2032}' | '\u{201B}' => "'",
        '\u{2033}' | '\u{201F}' => "\"",
        '\u{25AA}' | '\u{25CF}' | '\u{25E6}' | '\u{2043}' | '\u{2219}' => "•",
        '\u{2192}' => "->",
        '\u{2190}' => "<-",
        '\u{2264}' => "<=",
        '\u{2265}' => ">=",
        '\u{2260}' => "!=",
        _ => return None,
    };
    Some(folded)
}

/// Prepare text for rendering.
///
/// Line endings become `\n`, tabs become four spaces, zero-width and control
/// characters are dropped (form feeds are kept), typographic punctuation is
/// folded into WinAnsi, and anything else WinAnsi lacks becomes `?`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\n' | PAGE_BREAK => out.push(c),
            '\t' => out.push_str("    "),
            '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}' => {}
            c if c.is_control() => {}
            c => {
                if let Some(folded) = fold_punctuation(c) {
                    out.push_str(folded);
                } else if winansi_byte(c).is_some() {
                    out.push(c);
                } else {
                    out.push('?');
                }
            }
        }
    }

    out
}

/// Helvetica glyph width in thousandths of the font size.
pub fn glyph_width(c: char) -> u16 {
    const ASCII: [u16; 95] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
        278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
        278, 278, 278, 469, 556, 333, // '['..'`'
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
        334, 260, 334, 584, // '{'..'~'
    ];

    match c {
        ' '..='~' => ASCII[c as usize - 0x20],
        '…' | '—' | '‰' | '™' => 1000,
        '‘' | '’' | '‚' => 222,
        '“' | '”' | '„' => 333,
        '•' => 350,
        _ => 556,
    }
}

/// Width of `text` at `font_size`, in points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(c))).sum();
    units as f32 * font_size / 1000.0
}

/// Greedy word wrap of a single line.
///
/// Words wider than the line are split at the last glyph that fits. Leading
/// indentation is kept on the first output line only.
pub fn wrap_line(line: &str, max_width: f32, font_size: f32) -> Vec<String> {
    if text_width(line, font_size) <= max_width {
        return vec![line.trim_end().to_string()];
    }

    let indent_len = line.len() - line.trim_start().len();
    let mut lines = Vec::new();
    let mut current = line[..indent_len].to_string();

    for word in line.split_whitespace() {
        let candidate = if current.trim().is_empty() {
            format!("{current}{word}")
        } else {
            format!("{current} {word}")
        };

        if text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.trim().is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, font_size) <= max_width {
            current = word.to_string();
        } else {
            let mut units: u32 = current.chars().map(|c| u32::from(glyph_width(c))).sum();
            for c in word.chars() {
                let glyph = u32::from(glyph_width(c));
                if !current.trim().is_empty()
                    && (units + glyph) as f32 * font_size / 1000.0 > max_width
                {
                    lines.push(std::mem::take(&mut current));
                    units = 0;
                }
                current.push(c);
                units += glyph;
            }
        }
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Whether a line is rendered as a title.
pub fn is_title(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() <= TITLE_MAX_CHARS
        && trimmed.chars().any(char::is_alphabetic)
        && !trimmed.chars().any(char::is_lowercase)
}

/// Sanitize, wrap and paginate `text`.
///
/// Always returns at least one page. A form feed starts a new page.
pub fn layout_text(text: &str, layout: &PageLayout) -> Vec<Vec<PageLine>> {
    let clean = sanitize(text);
    let capacity = layout.lines_per_page();
    let max_width = layout.content_width();

    let mut pages: Vec<Vec<PageLine>> = Vec::new();
    let mut page: Vec<PageLine> = Vec::new();

    for (index, section) in clean.split(PAGE_BREAK).enumerate() {
        if index > 0 && !page.is_empty() {
            pages.push(std::mem::take(&mut page));
        }

        let section = section.strip_prefix('\n').unwrap_or(section);
        for raw in section.split('\n') {
            let wrapped: Vec<PageLine> = if is_title(raw) {
                wrap_line(raw.trim(), max_width, layout.title_size)
                    .into_iter()
                    .map(PageLine::title)
                    .collect()
            } else {
                wrap_line(raw, max_width, layout.font_size)
                    .into_iter()
                    .map(PageLine::body)
                    .collect()
            };

            for line in wrapped {
                if page.len() == capacity {
                    pages.push(std::mem::take(&mut page));
                }
                page.push(line);
            }
        }
    }

    while page.last().is_some_and(|l| l.text.is_empty()) {
        page.pop();
    }
    if !page.is_empty() || pages.is_empty() {
        pages.push(page);
    }
    pages
}
