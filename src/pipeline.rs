//! Document pipeline orchestration.
//!
//! Coordinates both stages:
//!
//! - **Outline**: layout → line features → statistics → title → headings →
//!   merged headings → `Outline` JSON per document.
//! - **Rank**: manifest → per-document analysis → sections → embeddings →
//!   `RankingOutput` JSON.
//!
//! Documents are processed one at a time. A document that cannot be read is
//! logged and skipped; the rest of the batch continues. Only the ranking
//! stage ever constructs an embedding provider.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::classify::{classify_lines, ClassifierInput};
use crate::config::{BoilerplateScope, Config};
use crate::embedding::{create_provider, Embedder};
use crate::features::build_lines;
use crate::layout::{is_supported, DocumentLoader};
use crate::merge::merge_headings;
use crate::models::{
    ExtractedSection, Heading, LayoutLine, Manifest, Outline, OutlineEntry, RankingMetadata,
    RankingOutput, RawPage, Section, SubsectionAnalysis,
};
use crate::rank::{build_query, rank_sections};
use crate::sections::{clean_heading_text, segment_sections};
use crate::stats::{FontTiering, FontTiers, KMeansTiering, PageFrequency};
use crate::title::{fallback_title, resolve_title};

/// Everything recovered from one document.
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    pub id: String,
    pub lines: Vec<LayoutLine>,
    pub tiers: FontTiers,
    pub frequency: Arc<PageFrequency>,
    pub title: String,
    /// Lines consumed by the title block.
    pub title_lines: HashSet<usize>,
    pub headings: Vec<Heading>,
}

impl DocumentAnalysis {
    pub fn outline(&self) -> Outline {
        Outline {
            title: self.title.clone(),
            outline: self
                .headings
                .iter()
                .map(|h| OutlineEntry {
                    level: h.level,
                    text: h.text.clone(),
                    page: h.page,
                })
                .collect(),
        }
    }

    pub fn sections(&self) -> Vec<Section> {
        segment_sections(
            &self.id,
            &self.lines,
            &self.headings,
            &self.title_lines,
            &self.frequency,
        )
    }
}

/// Run outline recovery on one document's layout.
///
/// `shared_frequency` is the corpus-wide table when boilerplate is judged
/// across documents; otherwise a table is built from this document alone.
pub fn analyze_document(
    id: &str,
    pages: &[RawPage],
    config: &Config,
    shared_frequency: Option<Arc<PageFrequency>>,
) -> DocumentAnalysis {
    let outline_config = &config.outline;
    let lines = build_lines(pages, outline_config);

    let sizes: Vec<f32> = lines.iter().map(|l| l.font_size).collect();
    let tiers = KMeansTiering.tier(&sizes, outline_config.font_tiers);
    let frequency = shared_frequency.unwrap_or_else(|| {
        Arc::new(PageFrequency::from_lines(
            &lines,
            outline_config.boilerplate_min_pages,
        ))
    });

    let title_block = resolve_title(&lines, &frequency, outline_config);
    let title_lines: HashSet<usize> = title_block
        .as_ref()
        .map(|t| t.lines.iter().copied().collect())
        .unwrap_or_default();

    let candidates = classify_lines(
        &lines,
        &ClassifierInput {
            tiers: &tiers,
            frequency: &frequency,
            consumed: &title_lines,
            config: outline_config,
        },
    );
    let headings = merge_headings(&candidates, &lines, outline_config);

    let title = match title_block {
        Some(block) => block.text,
        None => fallback_title(&headings).unwrap_or_default(),
    };

    tracing::debug!(
        "{}: {} lines, {} tiers, {} headings",
        id,
        lines.len(),
        tiers.len(),
        headings.len()
    );

    DocumentAnalysis {
        id: id.to_string(),
        lines,
        tiers,
        frequency,
        title,
        title_lines,
        headings,
    }
}

/// Supported documents under `input`, sorted by path. A file is returned
/// as-is; a directory is scanned one level deep.
///
/// Outlines are named by file stem, so a `.json` dump sharing its stem with
/// a PDF in the same directory is skipped in favor of the PDF.
pub fn collect_documents(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("Input not found: {}", input.display());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", input.display()))?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            documents.push(entry.path().to_path_buf());
        }
    }

    let pdf_stems: HashSet<String> = documents
        .iter()
        .filter(|p| has_extension(p, "pdf"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    documents.retain(|path| {
        let shadowed = has_extension(path, "json")
            && path
                .file_stem()
                .is_some_and(|s| pdf_stems.contains(&*s.to_string_lossy()));
        if shadowed {
            tracing::warn!(
                "skipping {}: a PDF with the same name is outlined instead",
                path.display()
            );
        }
        !shadowed
    });
    Ok(documents)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Outline every document under `input`.
///
/// Each outline is written as `<stem>.json` into `output`. With no output
/// directory, a single input file is printed to stdout. Returns the number
/// of outlines produced.
pub fn run_outline(config: &Config, input: &Path, output: Option<&Path>) -> Result<usize> {
    let documents = collect_documents(input)?;
    if output.is_none() && input.is_dir() {
        bail!("--output is required when INPUT is a directory");
    }
    if let Some(dir) = output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let mut loader = DocumentLoader::new(&config.layout);
    let mut written = 0;

    for path in &documents {
        let pages = match loader.load(path) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let id = document_id(path);
        let analysis = analyze_document(&id, &pages, config, None);
        let outline = analysis.outline();
        let json = serde_json::to_string_pretty(&outline)?;

        match output {
            Some(dir) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| id.clone());
                let out_path = dir.join(format!("{}.json", stem));
                std::fs::write(&out_path, json)
                    .with_context(|| format!("Failed to write {}", out_path.display()))?;
                tracing::info!(
                    "{}: {} headings -> {}",
                    id,
                    outline.outline.len(),
                    out_path.display()
                );
            }
            None => println!("{}", json),
        }
        written += 1;
    }

    tracing::info!("outlined {} of {} documents", written, documents.len());
    Ok(written)
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

/// Analyze, segment and rank the manifest's documents with `embedder`.
///
/// Documents that cannot be loaded are skipped but still listed in
/// `input_documents`. Entries without a filename are dropped entirely.
pub async fn rank_documents(
    config: &Config,
    manifest: &Manifest,
    input_dir: &Path,
    embedder: &dyn Embedder,
) -> Result<RankingOutput> {
    let mut loader = DocumentLoader::new(&config.layout);
    let mut loaded: Vec<(String, Vec<RawPage>)> = Vec::new();
    let mut input_documents = Vec::new();

    for document in &manifest.documents {
        if document.filename.trim().is_empty() {
            tracing::warn!("manifest entry without a filename, skipping");
            continue;
        }
        input_documents.push(document.filename.clone());
        let path = input_dir.join(&document.filename);
        match loader.load(&path) {
            Ok(pages) => loaded.push((document.filename.clone(), pages)),
            Err(e) => tracing::warn!("skipping {}: {}", document.filename, e),
        }
    }

    let shared = match config.outline.boilerplate_scope {
        BoilerplateScope::Document => None,
        BoilerplateScope::Corpus => {
            let mut corpus = PageFrequency::new(config.outline.boilerplate_min_pages);
            for (_, pages) in &loaded {
                corpus.add_document(&build_lines(pages, &config.outline));
            }
            Some(Arc::new(corpus))
        }
    };

    let mut sections = Vec::new();
    for (id, pages) in &loaded {
        let analysis = analyze_document(id, pages, config, shared.clone());
        let document_sections = analysis.sections();
        tracing::info!("{}: {} sections", id, document_sections.len());
        sections.extend(document_sections);
    }

    let query = build_query(
        &manifest.persona.role,
        &manifest.job_to_be_done.task,
        &config.ranking.fallback_query,
    );
    let ranked = rank_sections(
        &sections,
        &query,
        &config.ranking,
        config.embedding.batch_size,
        embedder,
    )
    .await?;

    let title_of = |section: &Section| {
        if config.ranking.clean_titles {
            clean_heading_text(&section.heading)
        } else {
            section.heading.clone()
        }
    };

    Ok(RankingOutput {
        metadata: RankingMetadata {
            input_documents,
            persona: manifest.persona.role.clone(),
            job_to_be_done: manifest.job_to_be_done.task.clone(),
            processing_timestamp: chrono::Utc::now().to_rfc3339(),
        },
        extracted_sections: ranked
            .iter()
            .map(|r| ExtractedSection {
                document: r.section.document.clone(),
                page_number: r.section.page,
                section_title: title_of(&r.section),
                importance_rank: r.rank,
            })
            .collect(),
        subsection_analysis: ranked
            .iter()
            .map(|r| SubsectionAnalysis {
                document: r.section.document.clone(),
                page_number: r.section.page,
                refined_text: r.excerpt.clone(),
            })
            .collect(),
    })
}

/// Rank the documents of `manifest_path` and write the result.
///
/// `input_dir` defaults to the manifest's directory. The result goes to
/// `output` as pretty JSON, or to stdout.
pub async fn run_rank(
    config: &Config,
    manifest_path: &Path,
    input_dir: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let input_dir = match input_dir {
        Some(dir) => dir.to_path_buf(),
        None => manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    if !config.embedding.is_enabled() {
        bail!("Ranking requires embeddings. Set [embedding] provider in config.");
    }
    let embedder = create_provider(&config.embedding)?;

    let result = rank_documents(config, &manifest, &input_dir, embedder.as_ref()).await?;
    let json = serde_json::to_string_pretty(&result)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                "ranked {} sections -> {}",
                result.extracted_sections.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, HeadingLevel, RawLine, RawSpan};

    fn raw_line(text: &str, font: &str, size: f32, y0: f32) -> RawLine {
        RawLine {
            spans: vec![RawSpan {
                text: text.to_string(),
                font_name: font.to_string(),
                font_size: size,
                bold: false,
                italic: false,
                bbox: BoundingBox::new(72.0, y0, 72.0 + 6.0 * text.len() as f32, y0 + size),
            }],
        }
    }

    fn page(index: usize, lines: Vec<RawLine>) -> RawPage {
        RawPage {
            index,
            width: 612.0,
            height: 792.0,
            lines,
        }
    }

    #[test]
    fn test_annual_report_title_not_a_heading() {
        let pages = vec![
            page(
                0,
                vec![
                    raw_line("Annual Report 2024", "Helvetica-Bold", 24.0, 80.0),
                    raw_line("This report describes the year in review.", "Helvetica", 11.0, 140.0),
                    raw_line("Revenue grew across all regions.", "Helvetica", 11.0, 154.0),
                ],
            ),
            page(
                1,
                vec![raw_line("Further discussion of the results.", "Helvetica", 11.0, 80.0)],
            ),
        ];
        let analysis = analyze_document("report.pdf", &pages, &Config::default(), None);
        let outline = analysis.outline();
        assert_eq!(outline.title, "Annual Report 2024");
        assert!(outline.outline.iter().all(|e| e.text != "Annual Report 2024"));
        assert!(analysis.title_lines.contains(&0));
    }

    #[test]
    fn test_numbered_outline() {
        let pages = vec![page(
            0,
            vec![
                raw_line("1. Introduction", "Arial-Bold", 14.0, 100.0),
                raw_line("1.1 Background", "Arial-Bold", 12.0, 120.0),
                raw_line("Body paragraph text for the background.", "Arial", 10.0, 140.0),
            ],
        )];
        let outline = analyze_document("doc.pdf", &pages, &Config::default(), None).outline();
        // Numbered lines never become the title block; the first H1 stands in.
        assert_eq!(outline.title, "1. Introduction");
        assert_eq!(
            outline.outline,
            vec![
                OutlineEntry {
                    level: HeadingLevel::H1,
                    text: "1. Introduction".to_string(),
                    page: 1,
                },
                OutlineEntry {
                    level: HeadingLevel::H2,
                    text: "1.1 Background".to_string(),
                    page: 1,
                },
            ]
        );

        let pages = vec![
            page(0, vec![raw_line("Cover Page Heading", "Arial", 20.0, 100.0)]),
            page(
                1,
                vec![
                    raw_line("1. Introduction", "Arial-Bold", 14.0, 100.0),
                    raw_line("1.1 Background", "Arial-Bold", 12.0, 120.0),
                    raw_line("Body paragraph text for the background.", "Arial", 10.0, 140.0),
                ],
            ),
        ];
        let outline = analyze_document("doc.pdf", &pages, &Config::default(), None).outline();
        assert_eq!(outline.title, "Cover Page Heading");
        assert_eq!(
            outline.outline,
            vec![
                OutlineEntry {
                    level: HeadingLevel::H1,
                    text: "1. Introduction".to_string(),
                    page: 2,
                },
                OutlineEntry {
                    level: HeadingLevel::H2,
                    text: "1.1 Background".to_string(),
                    page: 2,
                },
            ]
        );
    }

    #[test]
    fn test_empty_document_has_empty_outline() {
        let analysis = analyze_document("empty.pdf", &[], &Config::default(), None);
        assert_eq!(analysis.outline(), Outline::default());
        assert!(analysis.sections().is_empty());
    }

    #[test]
    fn test_collect_documents_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("a.json"), b"[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        let docs = collect_documents(dir.path()).unwrap();
        let names: Vec<String> = docs.iter().map(|p| document_id(p)).collect();
        assert_eq!(names, vec!["a.json", "b.pdf"]);
        assert!(collect_documents(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_collect_documents_prefers_pdf_on_stem_clash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("report.json"), b"[]").unwrap();
        std::fs::write(dir.path().join("summary.json"), b"[]").unwrap();
        let docs = collect_documents(dir.path()).unwrap();
        let names: Vec<String> = docs.iter().map(|p| document_id(p)).collect();
        assert_eq!(names, vec!["report.pdf", "summary.json"]);

        // An explicit file is never filtered.
        let single = collect_documents(&dir.path().join("report.json")).unwrap();
        assert_eq!(single.len(), 1);
    }
}
