//! Document statistics: font-size tiers and line page-frequency.
//!
//! Both are computed once per document (or once per corpus for the
//! frequency table) and then passed explicitly to the title resolver,
//! classifier and segmenter.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::LayoutLine;

const MAX_ITERATIONS: usize = 100;

/// One cluster of font sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub centroid: f32,
    pub min: f32,
    pub max: f32,
}

/// Font-size clusters, ordered by centroid descending (tier 0 = largest).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontTiers {
    tiers: Vec<Tier>,
}

impl FontTiers {
    pub fn new(mut tiers: Vec<Tier>) -> Self {
        tiers.sort_by(|a, b| b.centroid.partial_cmp(&a.centroid).unwrap_or(Ordering::Equal));
        Self { tiers }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Tier index of `size`: the cluster whose member range contains it,
    /// otherwise the nearest centroid (ties go to the larger centroid).
    pub fn tier_of(&self, size: f32) -> Option<usize> {
        let size = round_size(size);
        if let Some(index) = self
            .tiers
            .iter()
            .position(|t| size >= t.min - 0.05 && size <= t.max + 0.05)
        {
            return Some(index);
        }
        nearest(&self.tiers.iter().map(|t| t.centroid).collect::<Vec<_>>(), size)
    }
}

/// Groups the font sizes of a document into at most `k` tiers.
pub trait FontTiering {
    fn tier(&self, sizes: &[f32], k: usize) -> FontTiers;
}

/// Deterministic one-dimensional Lloyd's k-means over distinct sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct KMeansTiering;

impl FontTiering for KMeansTiering {
    fn tier(&self, sizes: &[f32], k: usize) -> FontTiers {
        let mut distinct: Vec<f32> = sizes
            .iter()
            .filter(|s| s.is_finite() && **s > 0.0)
            .map(|s| round_size(*s))
            .collect();
        distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        distinct.dedup_by(|a, b| (*a - *b).abs() < 1e-3);

        let n = distinct.len();
        let k = k.min(n);
        if k == 0 {
            return FontTiers::default();
        }

        let mut centroids: Vec<f32> = (0..k)
            .map(|i| {
                let index = if k == 1 { n / 2 } else { i * (n - 1) / (k - 1) };
                distinct[index]
            })
            .collect();
        let mut assignment: Vec<usize> = vec![usize::MAX; n];

        for _ in 0..MAX_ITERATIONS {
            let next: Vec<usize> = distinct
                .iter()
                .map(|size| nearest(&centroids, *size).unwrap_or(0))
                .collect();
            if next == assignment {
                break;
            }
            assignment = next;

            for (c, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<f32> = distinct
                    .iter()
                    .zip(&assignment)
                    .filter(|(_, a)| **a == c)
                    .map(|(s, _)| *s)
                    .collect();
                if !members.is_empty() {
                    *centroid = members.iter().sum::<f32>() / members.len() as f32;
                }
            }
        }

        let tiers = (0..k)
            .filter_map(|c| {
                let members: Vec<f32> = distinct
                    .iter()
                    .zip(&assignment)
                    .filter(|(_, a)| **a == c)
                    .map(|(s, _)| *s)
                    .collect();
                let min = members.iter().copied().reduce(f32::min)?;
                let max = members.iter().copied().reduce(f32::max)?;
                Some(Tier {
                    centroid: centroids[c],
                    min,
                    max,
                })
            })
            .collect();

        FontTiers::new(tiers)
    }
}

/// Index of the centroid nearest to `value`; on a tie the larger centroid
/// wins.
fn nearest(centroids: &[f32], value: f32) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = (value - centroid).abs();
        let better = match best {
            None => true,
            Some((b, d)) => {
                distance < d - 1e-6 || ((distance - d).abs() <= 1e-6 && *centroid > centroids[b])
            }
        };
        if better {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}

fn round_size(size: f32) -> f32 {
    (size * 10.0).round() / 10.0
}

/// The font size carrying the most characters (the body text size). Ties
/// go to the smaller size.
pub fn body_font_size(lines: &[LayoutLine]) -> Option<f32> {
    let mut chars: Vec<(f32, usize)> = Vec::new();
    for line in lines {
        let size = round_size(line.font_size);
        match chars.iter_mut().find(|(s, _)| (*s - size).abs() < 1e-3) {
            Some((_, count)) => *count += line.char_count,
            None => chars.push((size, line.char_count)),
        }
    }
    chars
        .into_iter()
        .max_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal))
        })
        .map(|(size, _)| size)
}

/// How many distinct pages each normalized line text occurs on.
#[derive(Debug, Clone, Default)]
pub struct PageFrequency {
    pages: HashMap<String, HashSet<(usize, usize)>>,
    documents: usize,
    min_pages: usize,
}

impl PageFrequency {
    pub fn new(min_pages: usize) -> Self {
        Self {
            pages: HashMap::new(),
            documents: 0,
            min_pages,
        }
    }

    /// Frequency table for a single document.
    pub fn from_lines(lines: &[LayoutLine], min_pages: usize) -> Self {
        let mut frequency = Self::new(min_pages);
        frequency.add_document(lines);
        frequency
    }

    /// Count the lines of another document. Pages of different documents
    /// are distinct.
    pub fn add_document(&mut self, lines: &[LayoutLine]) {
        let document = self.documents;
        self.documents += 1;
        for line in lines {
            let key = normalize_text(&line.text);
            if key.is_empty() {
                continue;
            }
            self.pages
                .entry(key)
                .or_default()
                .insert((document, line.page_index));
        }
    }

    pub fn count(&self, text: &str) -> usize {
        self.pages
            .get(&normalize_text(text))
            .map(|pages| pages.len())
            .unwrap_or(0)
    }

    pub fn is_boilerplate(&self, text: &str) -> bool {
        self.count(text) >= self.min_pages
    }

    pub fn documents(&self) -> usize {
        self.documents
    }
}

/// Lowercase, collapse whitespace, trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn line(text: &str, page_index: usize) -> LayoutLine {
        LayoutLine {
            index: 0,
            text: text.to_string(),
            page: page_index + 1,
            page_index,
            bbox: BoundingBox::default(),
            font_size: 10.0,
            font_name: "Times".to_string(),
            bold: false,
            italic: false,
            uniform_font: true,
            rel_pos: 0.5,
            centered: false,
            word_count: 1,
            char_count: text.len(),
            caps_ratio: 0.0,
            numbering_depth: None,
            has_keyword: false,
            ends_with_punctuation: false,
            ends_with_colon: false,
        }
    }

    fn assert_postconditions(tiers: &FontTiers, sizes: &[f32]) {
        let max = sizes.iter().copied().fold(f32::MIN, f32::max);
        assert_eq!(tiers.tier_of(max), Some(0));
        let mut used: Vec<usize> = sizes.iter().filter_map(|s| tiers.tier_of(*s)).collect();
        used.sort();
        used.dedup();
        assert_eq!(used, (0..tiers.len()).collect::<Vec<_>>());
        for pair in tiers.tiers().windows(2) {
            assert!(pair[0].centroid > pair[1].centroid);
        }
    }

    #[test]
    fn test_tiers_descending() {
        let sizes = [24.0, 16.0, 16.0, 12.0, 11.0, 11.0, 11.0, 9.0];
        let tiers = KMeansTiering.tier(&sizes, 4);
        assert_eq!(tiers.len(), 4);
        assert_eq!(tiers.tier_of(24.0), Some(0));
        assert_eq!(tiers.tier_of(16.0), Some(1));
        assert_eq!(tiers.tier_of(9.0), Some(3));
        assert_postconditions(&tiers, &sizes);
    }

    #[test]
    fn test_fewer_distinct_sizes_than_k() {
        let sizes = [12.0, 12.0, 18.0];
        let tiers = KMeansTiering.tier(&sizes, 4);
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers.tier_of(18.0), Some(0));
        assert_eq!(tiers.tier_of(12.0), Some(1));
    }

    #[test]
    fn test_single_size_and_empty() {
        let tiers = KMeansTiering.tier(&[11.0, 11.0], 4);
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers.tier_of(11.0), Some(0));
        assert!(KMeansTiering.tier(&[], 4).is_empty());
        assert_eq!(FontTiers::default().tier_of(10.0), None);
    }

    #[test]
    fn test_sizes_rounded_to_tenth() {
        let tiers = KMeansTiering.tier(&[12.0, 12.02, 11.98], 3);
        assert_eq!(tiers.len(), 1);
    }

    #[test]
    fn test_tiering_is_deterministic() {
        let sizes = [30.0, 22.0, 21.5, 14.0, 13.0, 10.0, 10.0, 9.5, 8.0];
        let a = KMeansTiering.tier(&sizes, 4);
        let b = KMeansTiering.tier(&sizes, 4);
        assert_eq!(a, b);
        assert_postconditions(&a, &sizes);
    }

    #[test]
    fn test_nearest_tie_goes_to_larger() {
        assert_eq!(nearest(&[10.0, 14.0], 12.0), Some(1));
        assert_eq!(nearest(&[14.0, 10.0], 12.0), Some(0));
    }

    #[test]
    fn test_body_font_size() {
        let mut lines = vec![line("Heading", 0), line("A long paragraph of body text.", 0)];
        lines[0].font_size = 18.0;
        lines[1].font_size = 11.0;
        assert_eq!(body_font_size(&lines), Some(11.0));
        assert_eq!(body_font_size(&[]), None);
    }

    #[test]
    fn test_page_frequency_counts_distinct_pages() {
        let mut lines: Vec<LayoutLine> = (0..10).map(|p| line("Page 3", p)).collect();
        lines.push(line("Page  3", 0));
        lines.push(line("Unique heading", 4));
        let frequency = PageFrequency::from_lines(&lines, 4);
        assert_eq!(frequency.count("page 3"), 10);
        assert!(frequency.is_boilerplate("PAGE 3"));
        assert!(!frequency.is_boilerplate("Unique heading"));
        assert_eq!(frequency.count("never seen"), 0);
    }

    #[test]
    fn test_corpus_frequency_spans_documents() {
        let doc_a: Vec<LayoutLine> = (0..2).map(|p| line("Company Confidential", p)).collect();
        let doc_b: Vec<LayoutLine> = (0..2).map(|p| line("Company Confidential", p)).collect();

        let local = PageFrequency::from_lines(&doc_a, 4);
        assert!(!local.is_boilerplate("Company Confidential"));

        let mut corpus = PageFrequency::new(4);
        corpus.add_document(&doc_a);
        corpus.add_document(&doc_b);
        assert_eq!(corpus.documents(), 2);
        assert!(corpus.is_boilerplate("company confidential"));
    }
}
