use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::config::{validate_threshold, Number};
use crate::corpus::Corpus;
use crate::error::AnalysisError;
use crate::vector_ops::cosine_similarity;

/// Two corpus documents (`i < j`) whose similarity met the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarPair {
    pub i: usize,
    pub j: usize,
    pub similarity: Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    Sequential,
    Parallel,
}

#[derive(Debug, Default)]
pub struct SearchTimings {
    pub compare_duration: Duration,
    pub sort_duration: Duration,
    pub total_duration: Duration,
}

fn compare_pair(corpus: &Corpus, i: usize, j: usize, threshold: Number) -> Option<SimilarPair> {
    let similarity = cosine_similarity(corpus.vector(i), corpus.vector(j));
    (similarity >= threshold).then_some(SimilarPair { i, j, similarity })
}

fn compare_row(corpus: &Corpus, i: usize, threshold: Number) -> impl Iterator<Item = SimilarPair> + '_ {
    (i + 1..corpus.len()).filter_map(move |j| compare_pair(corpus, i, j, threshold))
}

fn rank(pairs: &mut [SimilarPair]) {
    pairs.sort_by(SimilarPair::compare_by_rank);
}

/// Compares every unordered document pair and keeps those with similarity
/// `>= threshold`, ranked by similarity. Quadratic in corpus size.
pub fn find_pairs(corpus: &Corpus, threshold: Number) -> Result<Vec<SimilarPair>, AnalysisError> {
    search(corpus, threshold, SearchMethod::Sequential).map(|(pairs, _)| pairs)
}

/// Same result as [`find_pairs`], with rows of the comparison matrix spread
/// over the rayon thread pool.
pub fn find_pairs_parallel(
    corpus: &Corpus,
    threshold: Number,
) -> Result<Vec<SimilarPair>, AnalysisError> {
    search(corpus, threshold, SearchMethod::Parallel).map(|(pairs, _)| pairs)
}

pub fn search(
    corpus: &Corpus,
    threshold: Number,
    method: SearchMethod,
) -> Result<(Vec<SimilarPair>, SearchTimings), AnalysisError> {
    validate_threshold(threshold)?;
    let start = Instant::now();

    let mut pairs: Vec<SimilarPair> = match method {
        SearchMethod::Sequential => (0..corpus.len())
            .flat_map(|i| compare_row(corpus, i, threshold))
            .collect(),
        SearchMethod::Parallel => (0..corpus.len())
            .into_par_iter()
            .flat_map_iter(|i| compare_row(corpus, i, threshold))
            .collect(),
    };
    let compare_duration = start.elapsed();

    let sort_start = Instant::now();
    rank(&mut pairs);
    let sort_duration = sort_start.elapsed();

    let timings = SearchTimings {
        compare_duration,
        sort_duration,
        total_duration: start.elapsed(),
    };
    tracing::info!(
        method = ?method,
        documents = corpus.len(),
        pairs = pairs.len(),
        elapsed = ?timings.total_duration,
        "Pair search completed"
    );

    Ok((pairs, timings))
}

impl SimilarPair {
    /// Similarity descending, then `i`, then `j`.
    pub fn compare_by_rank(&self, other: &Self) -> Ordering {
        other
            .similarity
            .total_cmp(&self.similarity)
            .then_with(|| self.i.cmp(&other.i))
            .then_with(|| self.j.cmp(&other.j))
    }
}
