//! One-page PDF export for a finished letter.
//!
//! Layout is computed up front with approximate Helvetica metrics: the font
//! shrinks from 12pt to 10pt in half-point steps until the wrapped text fits,
//! and only then is the text cut with an ellipsis line.

use oxidize_pdf::{Document, Font, Page};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::names::{FALLBACK_CANDIDATE, FALLBACK_COMPANY};
use crate::text::char_prefix;

// US letter, in points.
const PAGE_HEIGHT: f64 = 792.0;
const PAGE_WIDTH: f64 = 612.0;
const MARGIN: f64 = 72.0;
const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
const CONTENT_HEIGHT: f64 = PAGE_HEIGHT - 2.0 * MARGIN;

const MAX_FONT_SIZE: f64 = 12.0;
const MIN_FONT_SIZE: f64 = 10.0;
const FONT_STEP: f64 = 0.5;
/// Average Helvetica glyph width in em.
const AVG_CHAR_EM: f64 = 0.5;
const LEADING: f64 = 1.35;

pub const ELLIPSIS_LINE: &str = "...";
const MAX_FILENAME_PART: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct LetterLayout {
    pub font_size: f64,
    pub line_height: f64,
    pub lines: Vec<String>,
    pub truncated: bool,
}

fn chars_per_line(font_size: f64) -> usize {
    (CONTENT_WIDTH / (font_size * AVG_CHAR_EM)).floor() as usize
}

fn lines_per_page(font_size: f64) -> usize {
    (CONTENT_HEIGHT / (font_size * LEADING)).floor() as usize
}

/// Map characters outside the standard PDF font encoding to ASCII.
fn to_pdf_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' => out.push('*'),
            '\u{00A0}' | '\t' => out.push(' '),
            c if (c as u32) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn wrap_letter(text: &str, font_size: f64) -> Vec<String> {
    let width = chars_per_line(font_size);
    let mut lines: Vec<String> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            // One blank line between paragraphs, never two in a row.
            if lines.last().is_some_and(|l| !l.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        lines.extend(textwrap::wrap(line, width).into_iter().map(|l| l.into_owned()));
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

pub fn layout_letter(text: &str) -> LetterLayout {
    let text = to_pdf_safe(text.trim());
    let mut font_size = MAX_FONT_SIZE;

    loop {
        let lines = wrap_letter(&text, font_size);
        let capacity = lines_per_page(font_size);

        if lines.len() <= capacity {
            return LetterLayout {
                font_size,
                line_height: font_size * LEADING,
                lines,
                truncated: false,
            };
        }

        if font_size - FONT_STEP < MIN_FONT_SIZE {
            let mut kept: Vec<String> = lines.into_iter().take(capacity.saturating_sub(1)).collect();
            while kept.last().is_some_and(|l| l.is_empty()) {
                kept.pop();
            }
            kept.push(ELLIPSIS_LINE.to_string());
            return LetterLayout {
                font_size,
                line_height: font_size * LEADING,
                lines: kept,
                truncated: true,
            };
        }
        font_size -= FONT_STEP;
    }
}

/// Keep ASCII letters, digits, spaces and hyphens; whitespace runs become `_`; at most 50 chars.
pub fn sanitize_filename_part(raw: &str, fallback: &str) -> String {
    let kept: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_");
    let capped = char_prefix(&joined, MAX_FILENAME_PART);

    if capped.is_empty() {
        fallback.to_string()
    } else {
        capped.to_string()
    }
}

pub fn pdf_filename(candidate_name: &str, company_name: &str) -> String {
    format!(
        "{}_Cover_Letter_{}.pdf",
        sanitize_filename_part(candidate_name, FALLBACK_CANDIDATE),
        sanitize_filename_part(company_name, FALLBACK_COMPANY)
    )
}

fn render(layout: &LetterLayout, candidate_name: &str, company_name: &str, path: &Path) -> Result<()> {
    let mut doc = Document::new();
    doc.set_title(format!("Cover Letter - {}", company_name));
    doc.set_author(candidate_name);

    let mut page = Page::letter();
    let mut y = PAGE_HEIGHT - MARGIN - layout.font_size;
    for line in &layout.lines {
        if !line.is_empty() {
            page.text()
                .set_font(Font::Helvetica, layout.font_size)
                .at(MARGIN, y)
                .write(line)
                .map_err(|e| AppError::Pdf(e.to_string()))?;
        }
        y -= layout.line_height;
    }

    doc.add_page(page);
    doc.save(path).map_err(|e| AppError::Pdf(e.to_string()))
}

/// Render `letter` to `{out_dir}/{Name}_Cover_Letter_{Company}.pdf` and return the path.
pub fn export_letter_pdf(letter: &str, candidate_name: &str, company_name: &str, out_dir: &Path) -> Result<PathBuf> {
    let layout = layout_letter(letter);
    if layout.truncated {
        warn!(font_size = layout.font_size, "letter does not fit one page, truncated");
    }

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(pdf_filename(candidate_name, company_name));
    render(&layout, candidate_name, company_name, &path)?;

    debug!(path = %path.display(), font_size = layout.font_size, lines = layout.lines.len(), "PDF written");
    Ok(path)
}
