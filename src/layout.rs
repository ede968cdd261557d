//! Layout primitive sources.
//!
//! A [`LayoutSource`] turns a file into pages of [`RawLine`]s carrying text,
//! bounding boxes and per-span font metadata. Two sources exist:
//!
//! - **[`PdfiumSource`]** reads PDFs through pdfium. Each text segment
//!   becomes a span styled from its first character; spans are grouped into
//!   lines by vertical mid-point proximity.
//! - **[`JsonDumpSource`]** reads a serialized `Vec<RawPage>` (the layout
//!   dump written by `outline layout`). Used for fixtures and for layout
//!   produced by external tooling.
//!
//! [`DocumentLoader`] picks the source from the file extension and binds
//! pdfium lazily, so runs over layout dumps never need the library.

use pdfium_render::prelude::*;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::LayoutConfig;
use crate::models::{BoundingBox, RawLine, RawPage, RawSpan};

/// A document could not be turned into layout primitives.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to bind pdfium library: {0}")]
    Bind(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("invalid layout dump {path}: {source}")]
    Dump {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that can yield layout primitives for a document.
pub trait LayoutSource {
    /// Short identifier used in logs (e.g. `"pdfium"`).
    fn name(&self) -> &str;
    /// Load every page of the document at `path`, in page order.
    fn load(&self, path: &Path) -> Result<Vec<RawPage>, LayoutError>;
}

// ============ JSON dump ============

pub struct JsonDumpSource {
    max_pages: usize,
}

impl JsonDumpSource {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            max_pages: config.max_pages,
        }
    }
}

impl LayoutSource for JsonDumpSource {
    fn name(&self) -> &str {
        "json"
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>, LayoutError> {
        let bytes = std::fs::read(path).map_err(|source| LayoutError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut pages: Vec<RawPage> =
            serde_json::from_slice(&bytes).map_err(|source| LayoutError::Dump {
                path: path.to_path_buf(),
                source,
            })?;
        pages.sort_by_key(|p| p.index);
        if self.max_pages > 0 {
            pages.truncate(self.max_pages);
        }
        Ok(pages)
    }
}

// ============ Pdfium ============

pub struct PdfiumSource {
    pdfium: Pdfium,
    max_pages: usize,
    line_merge_threshold: f32,
}

impl PdfiumSource {
    /// Bind pdfium from the working directory, falling back to the system
    /// library.
    pub fn new(config: &LayoutConfig) -> Result<Self, LayoutError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| LayoutError::Bind(e.to_string()))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            max_pages: config.max_pages,
            line_merge_threshold: config.line_merge_threshold,
        })
    }

    fn page_spans(&self, page: &PdfPage, page_height: f32) -> Result<Vec<RawSpan>, String> {
        let text = page
            .text()
            .map_err(|e| format!("failed to read page text: {}", e))?;

        let mut spans = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            if content.trim().is_empty() {
                continue;
            }

            let bounds = segment.bounds();
            // PDF space has a bottom-left origin.
            let bbox = BoundingBox::new(
                bounds.left().value,
                page_height - bounds.top().value,
                bounds.right().value,
                page_height - bounds.bottom().value,
            );
            let (font_size, font_name, bold, italic) = segment_style(&segment);

            spans.push(RawSpan {
                text: content.trim().to_string(),
                font_name,
                font_size,
                bold,
                italic,
                bbox,
            });
        }

        Ok(spans)
    }
}

impl LayoutSource for PdfiumSource {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>, LayoutError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| LayoutError::Pdf {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            if self.max_pages > 0 && index >= self.max_pages {
                break;
            }
            let width = page.width().value;
            let height = page.height().value;
            let spans = self
                .page_spans(&page, height)
                .map_err(|message| LayoutError::Pdf {
                    path: path.to_path_buf(),
                    message: format!("page {}: {}", index + 1, message),
                })?;

            tracing::debug!("page {}: {} spans", index + 1, spans.len());
            pages.push(RawPage {
                index,
                width,
                height,
                lines: group_into_lines(spans, self.line_merge_threshold),
            });
        }

        Ok(pages)
    }
}

fn segment_style(segment: &PdfPageTextSegment<'_>) -> (f32, String, bool, bool) {
    let Ok(chars) = segment.chars() else {
        return (0.0, String::new(), false, false);
    };

    let Some(first) = chars.iter().next() else {
        return (0.0, String::new(), false, false);
    };

    let font_size = first.scaled_font_size().value;
    let font_name = first.font_name();
    let weight_is_bold = match first.font_weight() {
        Some(PdfFontWeight::Weight600)
        | Some(PdfFontWeight::Weight700Bold)
        | Some(PdfFontWeight::Weight800)
        | Some(PdfFontWeight::Weight900) => true,
        Some(PdfFontWeight::Custom(weight)) => weight >= 600,
        _ => false,
    };
    let bold = weight_is_bold || first.font_is_bold_reenforced();
    let italic = first.font_is_italic();

    (font_size, font_name, bold, italic)
}

/// Group spans into lines, top to bottom, each line ordered left to right.
///
/// Two spans share a line when their vertical mid-points are within
/// `max(threshold, half the span height)`.
pub fn group_into_lines(mut spans: Vec<RawSpan>, threshold: f32) -> Vec<RawLine> {
    spans.sort_by(|a, b| {
        a.bbox
            .mid_y()
            .partial_cmp(&b.bbox.mid_y())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<(f32, Vec<RawSpan>)> = Vec::new();
    for span in spans {
        let mid_y = span.bbox.mid_y();
        let tolerance = threshold.max(span.bbox.height() * 0.5);
        if let Some((line_mid, line_spans)) = lines.last_mut() {
            if (*line_mid - mid_y).abs() <= tolerance {
                line_spans.push(span);
                continue;
            }
        }
        lines.push((mid_y, vec![span]));
    }

    lines
        .into_iter()
        .map(|(_, mut spans)| {
            spans.sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal));
            RawLine { spans }
        })
        .collect()
}

// ============ Loader ============

/// Picks a [`LayoutSource`] per file: `.json` files are layout dumps,
/// everything else goes through pdfium (bound on first use).
pub struct DocumentLoader {
    config: LayoutConfig,
    json: JsonDumpSource,
    pdfium: Option<PdfiumSource>,
}

impl DocumentLoader {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            config: config.clone(),
            json: JsonDumpSource::new(config),
            pdfium: None,
        }
    }

    pub fn load(&mut self, path: &Path) -> Result<Vec<RawPage>, LayoutError> {
        if is_layout_dump(path) {
            return self.json.load(path);
        }

        if self.pdfium.is_none() {
            self.pdfium = Some(PdfiumSource::new(&self.config)?);
        }
        match &self.pdfium {
            Some(source) => source.load(path),
            None => Err(LayoutError::Bind("pdfium unavailable".to_string())),
        }
    }
}

pub fn is_layout_dump(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Whether `path` is a document the loader accepts.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf") || ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
