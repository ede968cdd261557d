//! TOML configuration.
//!
//! Every heuristic threshold used by outline recovery and ranking lives here
//! so that corpora with unusual typography can be tuned without touching
//! code. All sections and fields have defaults; an empty file is a valid
//! configuration.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub outline: OutlineConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    /// Maximum number of pages read per document. `0` reads every page.
    #[serde(default)]
    pub max_pages: usize,
    /// Minimum vertical mid-point distance (points) under which two text
    /// segments are placed on the same line.
    #[serde(default = "default_line_merge_threshold")]
    pub line_merge_threshold: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_pages: 0,
            line_merge_threshold: default_line_merge_threshold(),
        }
    }
}

fn default_line_merge_threshold() -> f32 {
    2.0
}

/// Where the page-frequency table used for boilerplate detection is built.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoilerplateScope {
    /// One table per document.
    #[default]
    Document,
    /// One table shared by every document of a ranking run.
    Corpus,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutlineConfig {
    #[serde(default = "default_font_tiers")]
    pub font_tiers: usize,
    #[serde(default = "default_header_band")]
    pub header_band: f32,
    #[serde(default = "default_footer_band")]
    pub footer_band: f32,
    #[serde(default = "default_boilerplate_min_pages")]
    pub boilerplate_min_pages: usize,
    #[serde(default)]
    pub boilerplate_scope: BoilerplateScope,
    #[serde(default = "default_max_heading_words")]
    pub max_heading_words: usize,
    #[serde(default = "default_max_heading_chars")]
    pub max_heading_chars: usize,
    #[serde(default = "default_min_heading_chars")]
    pub min_heading_chars: usize,
    #[serde(default = "default_max_numbering_depth")]
    pub max_numbering_depth: usize,
    /// Maximum y0 distance between merged heading lines, as a multiple of
    /// the font size.
    #[serde(default = "default_merge_line_spacing")]
    pub merge_line_spacing: f32,
    /// Allowed offset of a line's mid-point from the page centre, as a
    /// fraction of the page width.
    #[serde(default = "default_centered_tolerance")]
    pub centered_tolerance: f32,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            font_tiers: default_font_tiers(),
            header_band: default_header_band(),
            footer_band: default_footer_band(),
            boilerplate_min_pages: default_boilerplate_min_pages(),
            boilerplate_scope: BoilerplateScope::default(),
            max_heading_words: default_max_heading_words(),
            max_heading_chars: default_max_heading_chars(),
            min_heading_chars: default_min_heading_chars(),
            max_numbering_depth: default_max_numbering_depth(),
            merge_line_spacing: default_merge_line_spacing(),
            centered_tolerance: default_centered_tolerance(),
            keywords: default_keywords(),
        }
    }
}

fn default_font_tiers() -> usize {
    4
}
fn default_header_band() -> f32 {
    0.05
}
fn default_footer_band() -> f32 {
    0.95
}
fn default_boilerplate_min_pages() -> usize {
    4
}
fn default_max_heading_words() -> usize {
    15
}
fn default_max_heading_chars() -> usize {
    120
}
fn default_min_heading_chars() -> usize {
    3
}
fn default_max_numbering_depth() -> usize {
    3
}
fn default_merge_line_spacing() -> f32 {
    1.5
}
fn default_centered_tolerance() -> f32 {
    0.05
}

fn default_keywords() -> Vec<String> {
    [
        "introduction",
        "overview",
        "summary",
        "abstract",
        "conclusion",
        "conclusions",
        "background",
        "methodology",
        "results",
        "discussion",
        "references",
        "appendix",
        "acknowledgements",
        "glossary",
        "preface",
        "chapter",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    /// Sections whose `"{heading}. {body}"` text is shorter than this are
    /// not embedded.
    #[serde(default = "default_min_section_chars")]
    pub min_section_chars: usize,
    #[serde(default = "default_clean_titles")]
    pub clean_titles: bool,
    #[serde(default = "default_fallback_query")]
    pub fallback_query: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            top_n: default_top_n(),
            excerpt_chars: default_excerpt_chars(),
            min_section_chars: default_min_section_chars(),
            clean_titles: default_clean_titles(),
            fallback_query: default_fallback_query(),
        }
    }
}

fn default_min_score() -> f32 {
    0.3
}
fn default_top_n() -> usize {
    5
}
fn default_excerpt_chars() -> usize {
    600
}
fn default_min_section_chars() -> usize {
    50
}
fn default_clean_titles() -> bool {
    true
}
fn default_fallback_query() -> String {
    "general information extraction".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Defaults to `all-minilm-l6-v2` for the local provider; required for
    /// the remote ones.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// When `allow_missing` is set and the file does not exist, the built-in
    /// defaults are returned instead of an error.
    pub fn load_or_default(path: &Path, allow_missing: bool) -> Result<Self> {
        if allow_missing && !path.exists() {
            tracing::debug!("config {} not found, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }
        load_config(path)
    }

    pub fn validate(&self) -> Result<()> {
        let outline = &self.outline;
        if outline.font_tiers == 0 {
            bail!("outline.font_tiers must be >= 1");
        }
        if !(0.0..=1.0).contains(&outline.header_band)
            || !(0.0..=1.0).contains(&outline.footer_band)
            || outline.header_band >= outline.footer_band
        {
            bail!("outline.header_band and outline.footer_band must satisfy 0 <= header < footer <= 1");
        }
        if outline.boilerplate_min_pages < 2 {
            bail!("outline.boilerplate_min_pages must be >= 2");
        }
        if !(1..=3).contains(&outline.max_numbering_depth) {
            bail!("outline.max_numbering_depth must be in 1..=3");
        }
        if outline.merge_line_spacing < 0.0 {
            bail!("outline.merge_line_spacing must be >= 0");
        }

        let ranking = &self.ranking;
        if ranking.top_n < 1 {
            bail!("ranking.top_n must be >= 1");
        }
        if !(-1.0..=1.0).contains(&ranking.min_score) {
            bail!("ranking.min_score must be in [-1.0, 1.0]");
        }

        let embedding = &self.embedding;
        if embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        match embedding.provider.as_str() {
            "disabled" | "local" => {}
            "openai" | "ollama" => {
                if embedding.dims.unwrap_or(0) == 0 {
                    bail!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        embedding.provider
                    );
                }
                if embedding.model.is_none() {
                    bail!(
                        "embedding.model must be specified when provider is '{}'",
                        embedding.provider
                    );
                }
            }
            "hashed" => {
                if embedding.dims.unwrap_or(0) == 0 {
                    bail!("embedding.dims must be > 0 when provider is 'hashed'");
                }
            }
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, local, or hashed.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
