//! Heading classification.
//!
//! Three passes per line:
//!
//! 1. **Prefilter**: only uniformly styled lines that are bold or all caps,
//!    numbered, or carry a heading keyword are considered. Noise (page numbers, revision
//!    footers, boilerplate, header/footer band) and title lines never are.
//! 2. **Level rules**: an ordered table of `(name, rule)` pairs; the first
//!    rule that yields a level wins.
//! 3. **Validation**: shapes that are almost never headings (dates, bullets,
//!    leader lines, sentences, overlong text) are demoted back to body text.
//!
//! Classification is a pure function of its inputs.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::config::OutlineConfig;
use crate::models::{HeadingCandidate, HeadingLevel, LayoutLine};
use crate::stats::{FontTiers, PageFrequency};

/// Everything the classifier reads besides the lines themselves.
pub struct ClassifierInput<'a> {
    pub tiers: &'a FontTiers,
    pub frequency: &'a PageFrequency,
    pub consumed: &'a HashSet<usize>,
    pub config: &'a OutlineConfig,
}

/// Per-line view handed to the level rules.
pub struct RuleContext<'a> {
    pub line: &'a LayoutLine,
    pub tier: Option<usize>,
    pub config: &'a OutlineConfig,
}

pub type LevelRule = fn(&RuleContext<'_>) -> Option<HeadingLevel>;

/// Level assignment, in priority order.
pub const LEVEL_RULES: &[(&str, LevelRule)] = &[
    ("numbering", rule_numbering),
    ("top_tier_emphasis", rule_top_tier),
    ("second_tier", rule_second_tier),
    ("keyword", rule_keyword),
    ("trailing_colon", rule_trailing_colon),
    ("third_tier", rule_third_tier),
    ("lower_tier", rule_lower_tier),
];

/// Classify every line, returning accepted candidates in line order.
pub fn classify_lines(lines: &[LayoutLine], input: &ClassifierInput<'_>) -> Vec<HeadingCandidate> {
    let candidates: Vec<HeadingCandidate> = lines
        .iter()
        .filter_map(|line| classify_line(line, input))
        .collect();
    tracing::debug!(
        "classified {} of {} lines as headings",
        candidates.len(),
        lines.len()
    );
    candidates
}

pub fn classify_line(line: &LayoutLine, input: &ClassifierInput<'_>) -> Option<HeadingCandidate> {
    if !passes_prefilter(line, input) {
        return None;
    }

    let ctx = RuleContext {
        line,
        tier: input.tiers.tier_of(line.font_size),
        config: input.config,
    };
    let level = assign_level(&ctx)?;

    if !passes_validation(line, input.config) {
        return None;
    }

    Some(HeadingCandidate {
        line: line.index,
        level,
    })
}

/// First matching rule of [`LEVEL_RULES`].
pub fn assign_level(ctx: &RuleContext<'_>) -> Option<HeadingLevel> {
    LEVEL_RULES.iter().find_map(|(_, rule)| rule(ctx))
}

fn passes_prefilter(line: &LayoutLine, input: &ClassifierInput<'_>) -> bool {
    let config = input.config;
    if input.consumed.contains(&line.index) {
        return false;
    }
    if !in_content_band(line, config) {
        return false;
    }
    if is_noise_line(line, input.frequency) {
        return false;
    }
    line.uniform_font
        && (line.bold || is_all_caps(line) || line.numbering_depth.is_some() || line.has_keyword)
}

/// Upper-case set text counts as emphasis, like bold.
fn is_all_caps(line: &LayoutLine) -> bool {
    line.caps_ratio >= ALL_CAPS_RATIO
}

const ALL_CAPS_RATIO: f32 = 0.9;

/// Inside the `(header_band, footer_band)` relative-position band.
pub fn in_content_band(line: &LayoutLine, config: &OutlineConfig) -> bool {
    line.rel_pos > config.header_band && line.rel_pos < config.footer_band
}

/// Boilerplate, page-number lines and revision footers.
pub fn is_noise_line(line: &LayoutLine, frequency: &PageFrequency) -> bool {
    is_page_number_line(&line.text)
        || is_revision_footer(&line.text)
        || frequency.is_boilerplate(&line.text)
}

pub fn is_page_number_line(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && (page_number_regex().is_match(text) || roman_page_regex().is_match(text))
}

pub fn is_revision_footer(text: &str) -> bool {
    revision_footer_regex().is_match(text.trim())
}

// ============ Level rules ============

fn rule_numbering(ctx: &RuleContext<'_>) -> Option<HeadingLevel> {
    let depth = ctx.line.numbering_depth?;
    Some(HeadingLevel::from_depth(
        depth.min(ctx.config.max_numbering_depth),
    ))
}

fn rule_top_tier(ctx: &RuleContext<'_>) -> Option<HeadingLevel> {
    (ctx.tier == Some(0) && (ctx.line.bold || ctx.line.centered)).then_some(HeadingLevel::H1)
}

fn rule_second_tier(ctx: &RuleContext<'_>) -> Option<HeadingLevel> {
    (ctx.tier == Some(1)).then_some(HeadingLevel::H2)
}

fn rule_keyword(ctx: &RuleContext<'_>) -> Option<HeadingLevel> {
    ctx.line.has_keyword.then_some(HeadingLevel::H2)
}

fn rule_trailing_colon(ctx: &RuleContext<'_>) -> Option<HeadingLevel> {
    ctx.line.ends_with_colon.then_some(HeadingLevel::H3)
}

fn rule_third_tier(ctx: &RuleContext<'_>) -> Option<HeadingLevel> {
    (ctx.tier == Some(2)).then_some(HeadingLevel::H3)
}

fn rule_lower_tier(ctx: &RuleContext<'_>) -> Option<HeadingLevel> {
    matches!(ctx.tier, Some(t) if t >= 3).then_some(HeadingLevel::H4)
}

// ============ Validation ============

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "if", "in", "into", "is", "it", "its", "no", "not", "of", "on", "or", "our",
    "she", "so", "such", "that", "the", "their", "then", "there", "these", "they", "this", "to",
    "was", "we", "were", "will", "with", "you", "your",
];

const BULLETS: &[char] = &['•', '●', '▪', '◦', '‣', '·', '-', '–', '—', '*', '○', '■'];

/// Whether the line survives the validation gate.
pub fn passes_validation(line: &LayoutLine, config: &OutlineConfig) -> bool {
    let text = line.text.trim();
    let numbered = line.numbering_depth.is_some();

    if line.word_count > config.max_heading_words || line.char_count > config.max_heading_chars {
        return false;
    }
    if line.char_count < config.min_heading_chars && !numbered {
        return false;
    }
    if !text.chars().any(|c| c.is_alphabetic()) {
        return false;
    }
    if text.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
        return false;
    }
    if is_date(text) {
        return false;
    }
    if line.word_count == 1 {
        let word: String = text
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if STOP_WORDS.contains(&word.as_str()) {
            return false;
        }
    }
    if text.starts_with(BULLETS) {
        return false;
    }
    if !numbered && line.ends_with_punctuation {
        return false;
    }
    if !line.bold && toc_leader_regex().is_match(text) {
        return false;
    }
    if line.page_index < 5 && text.to_lowercase().contains("table of contents") {
        return false;
    }
    true
}

pub fn is_date(text: &str) -> bool {
    date_regex().is_match(text.trim())
}

// ============ Patterns ============

fn page_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)^(?:
                page\s*\d+(?:\s*of\s*\d+)?
              | \d+\s*\|\s*page(?:\s*\d+)?
              | .{0,60}\|\s*page\s*\d+
              | [-–]\s*\d+\s*[-–]
              | \d{1,4}
            )$",
        )
        .expect("valid page number regex")
    })
}

/// Lowercase only: uppercase runs like `CLI` or `MIX` are words.
fn roman_page_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^m{0,3}(?:cm|cd|d?c{0,3})(?:xc|xl|l?x{0,3})(?:ix|iv|v?i{0,3})$")
            .expect("valid roman numeral regex")
    })
}

fn revision_footer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:revision|version|rev\.|document id|confidential)\s*[:\d\s.]*$")
            .expect("valid revision footer regex")
    })
}

fn toc_leader_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.(?:\s?\.){3,}").expect("valid leader regex"))
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)^(?:
                \d{1,2}\s+[a-z]{3,}\.?\s+\d{4}
              | [a-z]{3,}\.?\s+\d{1,2},?\s+\d{4}
              | \d{4}-\d{1,2}-\d{1,2}
              | \d{1,2}[/.]\d{1,2}[/.]\d{2,4}
            )$",
        )
        .expect("valid date regex")
    })
}
