//! Heading merger.
//!
//! A heading set in a large font often wraps onto two or three lines, each
//! of which the classifier accepts separately. Adjacent candidates that are
//! typographically one block are fused into a single [`Heading`].

use std::cmp::Ordering;

use crate::config::OutlineConfig;
use crate::models::{Heading, HeadingCandidate, LayoutLine};

const FONT_SIZE_EPSILON: f32 = 0.1;

/// Whether `next` continues the block ending at `prev`: same page, directly
/// following line, identical font, and vertically close.
pub fn continues(prev: &LayoutLine, next: &LayoutLine, config: &OutlineConfig) -> bool {
    if prev.page_index != next.page_index || next.index != prev.index + 1 {
        return false;
    }
    if (prev.font_size - next.font_size).abs() > FONT_SIZE_EPSILON
        || prev.font_name != next.font_name
        || prev.bold != next.bold
    {
        return false;
    }
    if next.numbering_depth.is_some() {
        return false;
    }
    let gap = next.bbox.y0 - prev.bbox.y0;
    gap >= 0.0 && gap <= config.merge_line_spacing * prev.font_size
}

/// Fuse candidates into headings, sorted by page, vertical position and
/// first line.
///
/// `candidates` must reference indices into `lines` (as produced by the
/// classifier).
pub fn merge_headings(
    candidates: &[HeadingCandidate],
    lines: &[LayoutLine],
    config: &OutlineConfig,
) -> Vec<Heading> {
    let mut headings: Vec<Heading> = Vec::new();
    let mut last_line: Option<&LayoutLine> = None;

    for candidate in candidates {
        let Some(line) = lines.get(candidate.line) else {
            continue;
        };

        if let (Some(prev), Some(current)) = (last_line, headings.last_mut()) {
            if current.level == candidate.level && continues(prev, line, config) {
                current.text.push(' ');
                current.text.push_str(&line.text);
                current.bbox = current.bbox.union(&line.bbox);
                current.last_line = line.index;
                last_line = Some(line);
                continue;
            }
        }

        headings.push(Heading {
            text: line.text.clone(),
            level: candidate.level,
            page: line.page,
            page_index: line.page_index,
            bbox: line.bbox,
            first_line: line.index,
            last_line: line.index,
        });
        last_line = Some(line);
    }

    headings.sort_by(|a, b| {
        a.page_index
            .cmp(&b.page_index)
            .then_with(|| a.bbox.y0.partial_cmp(&b.bbox.y0).unwrap_or(Ordering::Equal))
            .then_with(|| a.first_line.cmp(&b.first_line))
    });
    headings
}
