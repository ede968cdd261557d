//! # doc-outline
//!
//! Heuristic outline recovery for PDFs and persona-driven section ranking.
//!
//! Stage one recovers a title and an H1–H4 outline purely from typography and
//! layout: no OCR, no layout model. Stage two slices documents into
//! heading-delimited sections and ranks them against a persona and a job to
//! be done using embeddings.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌───────────┐
//! │  Layout  │──▶│ Features │──▶│ Statistics │──▶│ Classify  │
//! │ pdfium / │   │ per line │   │ tiers+freq │   │ + merge   │
//! │ JSON dump│   └──────────┘   └────────────┘   └─────┬─────┘
//! └──────────┘                                         │
//!                        ┌─────────────────────────────┤
//!                        ▼                             ▼
//!                 ┌────────────┐               ┌──────────────┐
//!                 │  Outline   │               │   Sections   │
//!                 │   JSON     │               │ → embed/rank │
//!                 └────────────┘               └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! outline outline ./pdfs --output ./out        # one <stem>.json per document
//! outline rank --manifest ./collection/input.json --output ./out/ranking.json
//! outline layout ./pdfs/report.pdf > report.json   # layout dump for fixtures
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`layout`] | Layout primitive sources (pdfium, JSON dump) |
//! | [`features`] | Per-line feature extraction |
//! | [`stats`] | Font-size tiering and page-frequency tables |
//! | [`title`] | Title resolution |
//! | [`classify`] | Heading classification |
//! | [`merge`] | Multi-line heading merging |
//! | [`sections`] | Section segmentation and excerpts |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`rank`] | Relevance ranking |
//! | [`pipeline`] | Outline and ranking runs |

pub mod classify;
pub mod config;
pub mod embedding;
pub mod features;
pub mod layout;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod rank;
pub mod sections;
pub mod stats;
pub mod title;
