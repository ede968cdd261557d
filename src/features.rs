//! Line feature builder.
//!
//! Converts raw layout primitives into [`LayoutLine`]s: textual features
//! (word/char counts, capitalization, numbering prefix, keywords, trailing
//! punctuation), visual features read from the dominant span, and positional
//! features normalized by page size. Lines without visible text are dropped.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::OutlineConfig;
use crate::models::{BoundingBox, LayoutLine, RawLine, RawPage, RawSpan};

const FONT_SIZE_EPSILON: f32 = 0.1;

/// Page context a line is built against.
#[derive(Debug, Clone, Copy)]
pub struct PageInfo {
    pub index: usize,
    pub printed: usize,
    pub width: f32,
    pub height: f32,
}

/// Build every line of a document in reading order, with contiguous indices.
pub fn build_lines(pages: &[RawPage], config: &OutlineConfig) -> Vec<LayoutLine> {
    let printed = printed_page_numbers(pages);
    let mut lines = Vec::new();

    for (page, printed) in pages.iter().zip(printed) {
        let info = PageInfo {
            index: page.index,
            printed,
            width: page.width,
            height: page.height,
        };
        for raw in &page.lines {
            if let Some(line) = build_line(lines.len(), raw, &info, config) {
                lines.push(line);
            }
        }
    }

    lines
}

/// Build one line. Returns `None` when the line carries no visible text.
pub fn build_line(
    index: usize,
    raw: &RawLine,
    page: &PageInfo,
    config: &OutlineConfig,
) -> Option<LayoutLine> {
    let spans: Vec<&RawSpan> = raw
        .spans
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();
    let dominant = *spans
        .iter()
        .fold(None::<&&RawSpan>, |best, span| match best {
            Some(b) if b.text.trim().chars().count() >= span.text.trim().chars().count() => {
                Some(b)
            }
            _ => Some(span),
        })?;

    let joined = spans
        .iter()
        .map(|s| s.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let text = collapse_whitespace(&joined);

    let bold = dominant.bold || font_name_is_bold(&dominant.font_name);
    let italic = dominant.italic || font_name_is_italic(&dominant.font_name);
    let uniform_font = spans.iter().all(|s| {
        s.font_name == dominant.font_name
            && (s.font_size - dominant.font_size).abs() <= FONT_SIZE_EPSILON
            && (s.bold || font_name_is_bold(&s.font_name)) == bold
            && (s.italic || font_name_is_italic(&s.font_name)) == italic
    });

    let bbox = spans
        .iter()
        .skip(1)
        .fold(spans[0].bbox, |acc, s| acc.union(&s.bbox));

    let rel_pos = if page.height > 0.0 {
        (bbox.y0 / page.height).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let char_count = text.chars().count();
    let trimmed_end = text.trim_end();

    Some(LayoutLine {
        index,
        page: page.printed,
        page_index: page.index,
        bbox,
        font_size: dominant.font_size,
        font_name: dominant.font_name.clone(),
        bold,
        italic,
        uniform_font,
        rel_pos,
        centered: is_centered(&bbox, page.width, config.centered_tolerance),
        word_count: text.split_whitespace().count(),
        char_count,
        caps_ratio: caps_ratio(&text),
        numbering_depth: numbering_depth(&text),
        has_keyword: has_keyword(&text, &config.keywords),
        ends_with_punctuation: trimmed_end.ends_with(['.', ';', ',']),
        ends_with_colon: trimmed_end.ends_with(':'),
        text,
    })
}

/// Printed page number per page: the `N` of the first `Page N of M` line,
/// otherwise the page position plus one.
pub fn printed_page_numbers(pages: &[RawPage]) -> Vec<usize> {
    pages
        .iter()
        .enumerate()
        .map(|(position, page)| {
            page.lines
                .iter()
                .find_map(|line| {
                    let text = line
                        .spans
                        .iter()
                        .map(|s| s.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    page_of_regex()
                        .captures(&text)
                        .and_then(|caps| caps.get(1))
                        .and_then(|m| m.as_str().parse::<usize>().ok())
                })
                .unwrap_or(position + 1)
        })
        .collect()
}

/// Depth of a `1.` / `1.2` / `1.2.3` numbering prefix.
///
/// A bare integer followed by text (`2024 Annual Report`) is not numbering.
pub fn numbering_depth(text: &str) -> Option<usize> {
    let caps = numbering_regex().captures(text.trim_start())?;
    let marker = caps.get(1)?.as_str().trim_end_matches('.');
    Some(marker.split('.').count())
}

pub fn has_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    keywords.iter().any(|kw| {
        let kw_words: Vec<&str> = kw.split_whitespace().collect();
        !kw_words.is_empty() && words.windows(kw_words.len()).any(|w| w == kw_words.as_slice())
    })
}

pub fn font_name_is_bold(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    lower.contains("bold") || lower.contains("black") || lower.contains("heavy") || lower.contains("-bd")
}

pub fn font_name_is_italic(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    lower.contains("italic") || lower.contains("oblique")
}

fn is_centered(bbox: &BoundingBox, page_width: f32, tolerance: f32) -> bool {
    if page_width <= 0.0 {
        return false;
    }
    let offset = (bbox.mid_x() - page_width / 2.0).abs();
    offset <= tolerance * page_width && bbox.width() < page_width * 0.8
}

fn caps_ratio(text: &str) -> f32 {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return 0.0;
    }
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    upper as f32 / letters as f32
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn numbering_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,3}(?:\.\d{1,3})+\.?|\d{1,3}\.)\s+\S").expect("valid numbering regex")
    })
}

fn page_of_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)page\s+(\d+)\s+of\s+\d+").expect("valid page regex"))
}
