//! Title resolution.
//!
//! The title is the unique largest-font block on the first page, set larger
//! than the body text. When the largest size is shared by several separate
//! blocks, or the first page has no usable lines, the first H1 heading is
//! used instead.

use crate::classify::{in_content_band, is_noise_line};
use crate::config::OutlineConfig;
use crate::merge::continues;
use crate::models::{Heading, HeadingLevel, LayoutLine};
use crate::stats::{body_font_size, PageFrequency};

const FONT_SIZE_EPSILON: f32 = 0.1;

/// A title read from the first page, with the lines it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleBlock {
    pub text: String,
    pub lines: Vec<usize>,
}

/// Find the title block on the first page, if it is unambiguous.
pub fn resolve_title(
    lines: &[LayoutLine],
    frequency: &PageFrequency,
    config: &OutlineConfig,
) -> Option<TitleBlock> {
    let body_size = body_font_size(lines)?;

    // Numbered lines belong to the outline.
    let candidates: Vec<&LayoutLine> = lines
        .iter()
        .filter(|l| l.page_index == 0)
        .filter(|l| l.uniform_font && in_content_band(l, config))
        .filter(|l| l.numbering_depth.is_none() && l.font_size > body_size + FONT_SIZE_EPSILON)
        .filter(|l| !is_noise_line(l, frequency))
        .filter(|l| l.text.chars().any(|c| c.is_alphabetic()))
        .collect();

    let max_size = candidates
        .iter()
        .map(|l| l.font_size)
        .fold(f32::MIN, f32::max);
    let largest: Vec<&LayoutLine> = candidates
        .into_iter()
        .filter(|l| (l.font_size - max_size).abs() <= FONT_SIZE_EPSILON)
        .collect();

    let mut runs: Vec<Vec<&LayoutLine>> = Vec::new();
    for line in largest {
        match runs.last_mut() {
            Some(run) if run.last().is_some_and(|prev| continues(prev, line, config)) => {
                run.push(line)
            }
            _ => runs.push(vec![line]),
        }
    }

    if runs.len() != 1 {
        tracing::debug!("no unique title block ({} runs)", runs.len());
        return None;
    }

    let run = runs.pop()?;
    Some(TitleBlock {
        text: run
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        lines: run.iter().map(|l| l.index).collect(),
    })
}

/// Text of the first H1 heading, used when no title block was found.
pub fn fallback_title(headings: &[Heading]) -> Option<String> {
    headings
        .iter()
        .find(|h| h.level == HeadingLevel::H1)
        .map(|h| h.text.clone())
}
