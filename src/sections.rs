//! Heading-delimited section segmenter and excerpt helpers.
//!
//! Splits a document's lines into [`Section`]s: each finalized heading opens
//! a section whose body runs until the next heading of any level. Noise
//! lines (boilerplate, page numbers, revision footers) and title lines are
//! excluded from every body, so the bodies partition the remaining text
//! after the first heading exactly once.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::classify::is_noise_line;
use crate::models::{Heading, LayoutLine, Section};
use crate::stats::PageFrequency;

/// Slice `lines` into sections at each heading.
pub fn segment_sections(
    document: &str,
    lines: &[LayoutLine],
    headings: &[Heading],
    consumed: &HashSet<usize>,
    frequency: &PageFrequency,
) -> Vec<Section> {
    let openers: HashMap<usize, &Heading> = headings.iter().map(|h| (h.first_line, h)).collect();
    let continuation: HashSet<usize> = headings
        .iter()
        .flat_map(|h| (h.first_line + 1)..=h.last_line)
        .collect();

    let mut sections: Vec<Section> = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    for line in lines {
        if let Some(heading) = openers.get(&line.index) {
            if let Some(open) = sections.last_mut() {
                open.body = body.join("\n");
            }
            body.clear();
            sections.push(Section {
                document: document.to_string(),
                heading: heading.text.clone(),
                level: heading.level,
                page: heading.page,
                body: String::new(),
                ordinal: sections.len(),
            });
            continue;
        }

        if continuation.contains(&line.index)
            || consumed.contains(&line.index)
            || is_noise_line(line, frequency)
        {
            continue;
        }

        if !sections.is_empty() {
            let text = line.text.trim();
            if !text.is_empty() {
                body.push(text);
            }
        }
    }

    if let Some(open) = sections.last_mut() {
        open.body = body.join("\n");
    }

    tracing::debug!("{}: {} sections", document, sections.len());
    sections
}

/// Extractive excerpt of `body` within `budget` characters.
///
/// Whole sentences are taken in order while they fit. When even the first
/// sentence is too long it is cut at the last word boundary that fits.
pub fn refine_excerpt(body: &str, budget: usize) -> String {
    let words: Vec<&str> = body.split_whitespace().collect();
    if words.is_empty() || budget == 0 {
        return String::new();
    }

    let mut sentences: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in words {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            sentences.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        sentences.push(current.join(" "));
    }

    let mut excerpt = String::new();
    for sentence in &sentences {
        let needed = if excerpt.is_empty() {
            sentence.chars().count()
        } else {
            excerpt.chars().count() + 1 + sentence.chars().count()
        };
        if needed > budget {
            break;
        }
        if !excerpt.is_empty() {
            excerpt.push(' ');
        }
        excerpt.push_str(sentence);
    }

    if excerpt.is_empty() {
        return cut_at_word_boundary(&sentences[0], budget);
    }
    excerpt
}

fn cut_at_word_boundary(text: &str, budget: usize) -> String {
    let mut out = String::new();
    for word in text.split_whitespace() {
        let needed = if out.is_empty() {
            word.chars().count()
        } else {
            out.chars().count() + 1 + word.chars().count()
        };
        if needed > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        return text.chars().take(budget).collect();
    }
    out
}

/// Heading text without leading numbering or bullet glyphs.
pub fn clean_heading_text(text: &str) -> String {
    let stripped = heading_prefix_regex().replace(text, "");
    let cleaned = crate::features::collapse_whitespace(&stripped);
    if cleaned.is_empty() {
        return crate::features::collapse_whitespace(text);
    }
    cleaned
}

fn heading_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:\d{1,3}(?:\.\d{1,3})*\.?\s+|[•●▪◦‣·\-–—*]\s*)+").expect("valid prefix regex")
    })
}
