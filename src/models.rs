//! Core data models.
//!
//! Types flow strictly forward through the pipeline: raw layout primitives
//! become [`LayoutLine`]s, lines become [`HeadingCandidate`]s and finalized
//! [`Heading`]s, headings slice the document into [`Section`]s, and the
//! ranker turns sections into [`RankedSection`]s. Output shapes
//! ([`Outline`], [`RankingOutput`]) mirror the JSON written by the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Layout primitives ============

/// Axis-aligned box in top-left-origin page coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).abs()
    }

    pub fn mid_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }
}

/// A run of text sharing one font and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    pub text: String,
    pub font_name: String,
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    pub spans: Vec<RawSpan>,
}

/// One page of layout primitives, as produced by a
/// [`LayoutSource`](crate::layout::LayoutSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Zero-based position of the page in the file.
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<RawLine>,
}

// ============ Lines ============

/// One visually contiguous line of text with its derived features.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    /// Position of the line in the document's reading order.
    pub index: usize,
    pub text: String,
    /// Printed page number.
    pub page: usize,
    pub page_index: usize,
    pub bbox: BoundingBox,
    pub font_size: f32,
    pub font_name: String,
    pub bold: bool,
    pub italic: bool,
    pub uniform_font: bool,
    pub rel_pos: f32,
    pub centered: bool,
    pub word_count: usize,
    pub char_count: usize,
    /// Uppercase letters over all letters.
    pub caps_ratio: f32,
    /// Number of numeric components in a `1.`, `1.2`, `1.2.3` prefix.
    pub numbering_depth: Option<usize>,
    pub has_keyword: bool,
    /// Ends in `.`, `;` or `,`, the way running text does.
    pub ends_with_punctuation: bool,
    pub ends_with_colon: bool,
}

// ============ Headings ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    Title,
    H1,
    H2,
    H3,
    H4,
}

impl HeadingLevel {
    /// Level for a numbering prefix of the given depth (1 → H1 … 3 → H3).
    pub fn from_depth(depth: usize) -> HeadingLevel {
        match depth {
            0 | 1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            _ => HeadingLevel::H3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeadingLevel::Title => "Title",
            HeadingLevel::H1 => "H1",
            HeadingLevel::H2 => "H2",
            HeadingLevel::H3 => "H3",
            HeadingLevel::H4 => "H4",
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line accepted by the classifier, tagged with a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingCandidate {
    pub line: usize,
    pub level: HeadingLevel,
}

/// A finalized heading, possibly fused from several adjacent lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub text: String,
    pub level: HeadingLevel,
    pub page: usize,
    pub page_index: usize,
    pub bbox: BoundingBox,
    pub first_line: usize,
    pub last_line: usize,
}

// ============ Sections ============

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub document: String,
    pub heading: String,
    pub level: HeadingLevel,
    pub page: usize,
    pub body: String,
    /// Ordinal of the section within its document.
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSection {
    pub section: Section,
    pub score: f32,
    pub rank: usize,
    pub excerpt: String,
}

// ============ Outputs ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingMetadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub page_number: usize,
    pub section_title: String,
    pub importance_rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub page_number: usize,
    pub refined_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingOutput {
    pub metadata: RankingMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

// ============ Input manifest ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub documents: Vec<ManifestDocument>,
    #[serde(default)]
    pub persona: Persona,
    #[serde(default)]
    pub job_to_be_done: JobToBeDone,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobToBeDone {
    #[serde(default)]
    pub task: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox::new(10.0, 20.0, 100.0, 32.0);
        let b = BoundingBox::new(5.0, 34.0, 80.0, 46.0);
        assert_eq!(a.union(&b), BoundingBox::new(5.0, 20.0, 100.0, 46.0));
    }

    #[test]
    fn test_level_serializes_as_tag() {
        let entry = OutlineEntry {
            level: HeadingLevel::H2,
            text: "1.1 Background".to_string(),
            page: 2,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "H2");
        assert_eq!(json["page"], 2);
    }

    #[test]
    fn test_manifest_tolerates_missing_fields() {
        let manifest: Manifest = serde_json::from_str(
            r#"{"documents": [{"filename": "a.pdf"}], "persona": {"role": "Analyst"}}"#,
        )
        .unwrap();
        assert_eq!(manifest.documents.len(), 1);
        assert_eq!(manifest.persona.role, "Analyst");
        assert_eq!(manifest.job_to_be_done.task, "");
    }

    #[test]
    fn test_level_from_depth() {
        assert_eq!(HeadingLevel::from_depth(1), HeadingLevel::H1);
        assert_eq!(HeadingLevel::from_depth(2), HeadingLevel::H2);
        assert_eq!(HeadingLevel::from_depth(5), HeadingLevel::H3);
    }
}
