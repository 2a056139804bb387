//! Near-duplicate detection for quiz question banks.
//!
//! Every question record is flattened into one document (prompt, answers,
//! feedbacks), normalized, weighted with TF-IDF over the whole run, and
//! compared pairwise with cosine similarity. Pairs at or above a threshold are
//! ranked and classified as exact, same-source or cross-source duplicates.

pub mod config;
pub mod corpus;
pub mod error;
pub mod record;
pub mod render;
pub mod report;
pub mod search;
pub mod text;
pub mod vector_ops;

pub use crate::corpus::{Corpus, Document, DocumentInfo};
pub use crate::error::AnalysisError;
pub use crate::record::QuestionRecord;
pub use crate::report::{analyze, analyze_with, AnalysisOptions, AnalysisResult, Statistics};
pub use crate::search::{find_pairs, find_pairs_parallel, SearchMethod, SimilarPair};
