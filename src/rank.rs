//! Persona-driven section ranking.
//!
//! The persona and job form one query; every section long enough to carry
//! meaning is embedded as `"{heading}. {body}"` and scored by cosine
//! similarity against the query. Sections under `min_score` are dropped,
//! the rest are sorted and truncated to `top_n`.

use anyhow::{bail, Result};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::RankingConfig;
use crate::embedding::{cosine_similarity, embed_query, Embedder};
use crate::models::{RankedSection, Section};
use crate::sections::refine_excerpt;

/// `"{persona} {job}"`, or the fallback query when both are blank.
pub fn build_query(persona: &str, job: &str, fallback: &str) -> String {
    let query = format!("{} {}", persona.trim(), job.trim());
    let query = query.trim();
    if query.is_empty() {
        fallback.to_string()
    } else {
        query.to_string()
    }
}

/// The text embedded for a section.
pub fn section_text(section: &Section) -> String {
    format!("{}. {}", section.heading.trim(), section.body.trim())
}

/// Embed, score and select the most relevant sections.
///
/// `sections` must be in document order (documents in input order, sections
/// in reading order); that order breaks score ties.
pub async fn rank_sections(
    sections: &[Section],
    query: &str,
    config: &RankingConfig,
    batch_size: usize,
    embedder: &dyn Embedder,
) -> Result<Vec<RankedSection>> {
    let eligible: Vec<usize> = sections
        .iter()
        .enumerate()
        .filter(|(_, s)| section_text(s).chars().count() >= config.min_section_chars)
        .map(|(i, _)| i)
        .collect();

    tracing::info!(
        "ranking {} of {} sections with {}",
        eligible.len(),
        sections.len(),
        embedder.model_name()
    );

    let query_vec = embed_query(embedder, query).await?;

    let mut scored: Vec<(usize, f32)> = Vec::with_capacity(eligible.len());
    for batch in eligible.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|i| section_text(&sections[*i])).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            bail!(
                "Embedding provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
        }
        for (index, vector) in batch.iter().zip(vectors.iter()) {
            scored.push((*index, cosine_similarity(&query_vec, vector)));
        }
    }

    Ok(select_top(sections, &scored, config))
}

/// Threshold, sort and truncate scored sections. Pure and deterministic.
pub fn select_top(
    sections: &[Section],
    scored: &[(usize, f32)],
    config: &RankingConfig,
) -> Vec<RankedSection> {
    let mut document_order: HashMap<&str, usize> = HashMap::new();
    for section in sections {
        let next = document_order.len();
        document_order.entry(section.document.as_str()).or_insert(next);
    }
    let order_of = |i: usize| {
        document_order
            .get(sections[i].document.as_str())
            .copied()
            .unwrap_or(usize::MAX)
    };

    let mut kept: Vec<(usize, f32)> = scored
        .iter()
        .copied()
        .filter(|(i, score)| *i < sections.len() && *score >= config.min_score)
        .collect();

    kept.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| order_of(a.0).cmp(&order_of(b.0)))
            .then_with(|| sections[a.0].page.cmp(&sections[b.0].page))
            .then_with(|| sections[a.0].ordinal.cmp(&sections[b.0].ordinal))
    });
    kept.truncate(config.top_n);

    kept.into_iter()
        .enumerate()
        .map(|(position, (i, score))| {
            let section = sections[i].clone();
            let mut excerpt = refine_excerpt(&section.body, config.excerpt_chars);
            if excerpt.is_empty() {
                excerpt = refine_excerpt(&section.heading, config.excerpt_chars);
            }
            RankedSection {
                section,
                score,
                rank: position + 1,
                excerpt,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HeadingLevel;
    use async_trait::async_trait;

    /// Returns a fixed vector per text; unknown texts map to the zero vector.
    /// `short_by` drops vectors from multi-text batches.
    struct CannedEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        short_by: usize,
    }

    #[async_trait]
    impl Embedder for CannedEmbedder {
        fn model_name(&self) -> &str {
            "canned"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out: Vec<Vec<f32>> = texts
                .iter()
                .map(|t| self.vectors.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
                .collect();
            if texts.len() > 1 {
                out.truncate(out.len().saturating_sub(self.short_by));
            }
            Ok(out)
        }
    }

    fn section(document: &str, ordinal: usize, page: usize, heading: &str) -> Section {
        Section {
            document: document.to_string(),
            heading: heading.to_string(),
            level: HeadingLevel::H1,
            page,
            body: format!("Body text for {} that is long enough to be embedded.", heading),
            ordinal,
        }
    }

    /// Unit vector at `angle` radians from the query direction `[1, 0]`.
    fn at_angle(angle: f32) -> Vec<f32> {
        vec![angle.cos(), angle.sin()]
    }

    fn corpus() -> (Vec<Section>, CannedEmbedder) {
        let mut sections = Vec::new();
        let mut vectors = HashMap::new();
        vectors.insert(
            "Environmental Scientist climate change impacts on biodiversity".to_string(),
            vec![1.0, 0.0],
        );
        for (d, doc) in ["a.pdf", "b.pdf", "c.pdf"].iter().enumerate() {
            for s in 0..5 {
                let s = section(doc, s, s + 1, &format!("{} section {}", doc, s));
                // Similarities spread over (-1, 1); some fall under the 0.3 cutoff.
                let angle = 0.1 + 0.2 * (d * 5 + s.ordinal) as f32;
                vectors.insert(section_text(&s), at_angle(angle));
                sections.push(s);
            }
        }
        (
            sections,
            CannedEmbedder {
                vectors,
                short_by: 0,
            },
        )
    }

    #[test]
    fn test_build_query() {
        assert_eq!(build_query(" Analyst ", "find risks", "fb"), "Analyst find risks");
        assert_eq!(build_query("", "find risks", "fb"), "find risks");
        assert_eq!(build_query("  ", "", "fb"), "fb");
    }

    #[tokio::test]
    async fn test_top_n_above_threshold() {
        let (sections, embedder) = corpus();
        let config = RankingConfig::default();
        let query = build_query(
            "Environmental Scientist",
            "climate change impacts on biodiversity",
            &config.fallback_query,
        );
        let ranked = rank_sections(&sections, &query, &config, 4, &embedder)
            .await
            .unwrap();

        assert_eq!(ranked.len(), 5);
        for (i, r) in ranked.iter().enumerate() {
            assert_eq!(r.rank, i + 1);
            assert!(r.score >= config.min_score);
        }
        for pair in ranked.windows(2) {
            assert!(pair[0].score > pair[1].score);
        }
        assert_eq!(ranked[0].section.heading, "a.pdf section 0");
        assert_eq!(ranked[4].section.heading, "a.pdf section 4");
    }

    #[tokio::test]
    async fn test_threshold_can_leave_fewer_than_top_n() {
        let (sections, embedder) = corpus();
        let config = RankingConfig {
            min_score: 0.9,
            top_n: 10,
            ..RankingConfig::default()
        };
        let query = "Environmental Scientist climate change impacts on biodiversity";
        let ranked = rank_sections(&sections, query, &config, 64, &embedder)
            .await
            .unwrap();
        // cos(0.1) and cos(0.3) clear 0.9; cos(0.5) does not.
        assert_eq!(ranked.len(), 2);
    }

    #[tokio::test]
    async fn test_ranking_is_deterministic() {
        let (sections, embedder) = corpus();
        let config = RankingConfig::default();
        let query = "Environmental Scientist climate change impacts on biodiversity";
        let first = rank_sections(&sections, query, &config, 3, &embedder)
            .await
            .unwrap();
        let second = rank_sections(&sections, query, &config, 7, &embedder)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_is_error() {
        let (sections, mut embedder) = corpus();
        embedder.short_by = 1;
        let err = rank_sections(&sections, "q", &RankingConfig::default(), 64, &embedder)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("vectors"));
    }

    #[tokio::test]
    async fn test_short_sections_not_embedded() {
        let mut short = section("a.pdf", 0, 1, "Tiny");
        short.body = "x".to_string();
        let mut vectors = HashMap::new();
        vectors.insert("q".to_string(), vec![1.0, 0.0]);
        vectors.insert(section_text(&short), vec![1.0, 0.0]);
        let embedder = CannedEmbedder {
            vectors,
            short_by: 0,
        };
        let ranked = rank_sections(&[short], "q", &RankingConfig::default(), 64, &embedder)
            .await
            .unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_ties_break_by_document_page_ordinal() {
        let sections = vec![
            section("b.pdf", 0, 4, "B first"),
            section("a.pdf", 1, 2, "A second"),
            section("a.pdf", 0, 2, "A first"),
        ];
        let scored = vec![(2, 0.5), (1, 0.5), (0, 0.5)];
        let ranked = select_top(&sections, &scored, &RankingConfig::default());
        let headings: Vec<&str> = ranked.iter().map(|r| r.section.heading.as_str()).collect();
        assert_eq!(headings, vec!["B first", "A first", "A second"]);
    }

    #[test]
    fn test_excerpt_respects_budget() {
        let mut s = section("a.pdf", 0, 1, "Heading");
        s.body = "First sentence here. Second sentence is longer than the budget allows.".to_string();
        let config = RankingConfig {
            excerpt_chars: 30,
            ..RankingConfig::default()
        };
        let ranked = select_top(&[s], &[(0, 0.9)], &config);
        assert_eq!(ranked[0].excerpt, "First sentence here.");
    }
}
