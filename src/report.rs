//! Duplicate classification and the structured result handed to renderers.
//!
//! Nothing here performs I/O. Renderers in [`crate::render`] turn an
//! [`AnalysisResult`] into text, Markdown, JSON or a removal script.

use serde::Serialize;
use statrs::statistics::Statistics as SampleStatistics;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{validate_threshold, Number, DEFAULT_EXACT_THRESHOLD};
use crate::corpus::{Corpus, DocumentInfo};
use crate::error::AnalysisError;
use crate::record::QuestionRecord;
use crate::search::{search, SearchMethod, SimilarPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRelation {
    SameGroup,
    CrossGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedPair {
    #[serde(flatten)]
    pub pair: SimilarPair,
    pub relation: GroupRelation,
    pub exact_duplicate: bool,
}

impl ClassifiedPair {
    pub fn is_cross_group(&self) -> bool {
        self.relation == GroupRelation::CrossGroup
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub pair_count: usize,
    pub mean: Number,
    pub max: Number,
    pub min: Number,
    pub std_dev: Number,
    pub exact_duplicates: usize,
    pub cross_group: usize,
    pub same_group: usize,
}

impl Statistics {
    fn from_pairs(pairs: &[ClassifiedPair]) -> Self {
        if pairs.is_empty() {
            return Self::default();
        }
        let scores: Vec<Number> = pairs.iter().map(|p| p.pair.similarity).collect();
        let cross_group = pairs.iter().filter(|p| p.is_cross_group()).count();

        Self {
            pair_count: pairs.len(),
            mean: SampleStatistics::mean(&scores),
            max: SampleStatistics::max(&scores),
            min: SampleStatistics::min(&scores),
            std_dev: if scores.len() > 1 {
                SampleStatistics::std_dev(&scores)
            } else {
                0.0
            },
            exact_duplicates: pairs.iter().filter(|p| p.exact_duplicate).count(),
            cross_group,
            same_group: pairs.len() - cross_group,
        }
    }
}

/// Options for [`analyze_with`].
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub threshold: Number,
    pub exact_threshold: Number,
    pub method: SearchMethod,
}

impl AnalysisOptions {
    pub fn new(threshold: Number) -> Self {
        Self {
            threshold,
            exact_threshold: DEFAULT_EXACT_THRESHOLD,
            method: SearchMethod::Sequential,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub threshold: Number,
    pub exact_threshold: Number,
    /// Indexed by corpus position; pair indices refer into this list.
    pub documents: Vec<DocumentInfo>,
    /// Ranked by similarity, highest first.
    pub pairs: Vec<ClassifiedPair>,
    pub statistics: Statistics,
    /// Source group to positions in `pairs` of every pair touching that group.
    pub pairs_by_group: BTreeMap<String, Vec<usize>>,
}

impl AnalysisResult {
    /// Every pair index must be a position in `documents`.
    pub(crate) fn classify(
        documents: Vec<DocumentInfo>,
        pairs: Vec<SimilarPair>,
        threshold: Number,
        exact_threshold: Number,
    ) -> Self {
        let classified: Vec<ClassifiedPair> = pairs
            .into_iter()
            .map(|pair| {
                let relation = if documents[pair.i].source == documents[pair.j].source {
                    GroupRelation::SameGroup
                } else {
                    GroupRelation::CrossGroup
                };
                ClassifiedPair {
                    pair,
                    relation,
                    exact_duplicate: pair.similarity >= exact_threshold,
                }
            })
            .collect();

        let mut pairs_by_group: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (rank, p) in classified.iter().enumerate() {
            let first = &documents[p.pair.i].source;
            let second = &documents[p.pair.j].source;
            pairs_by_group.entry(first.clone()).or_default().push(rank);
            if second != first {
                pairs_by_group.entry(second.clone()).or_default().push(rank);
            }
        }

        let statistics = Statistics::from_pairs(&classified);

        Self {
            threshold,
            exact_threshold,
            documents,
            pairs: classified,
            statistics,
            pairs_by_group,
        }
    }

    /// # Panics
    ///
    /// Panics if `index` is not a position in `documents`.
    pub fn document(&self, index: usize) -> &DocumentInfo {
        &self.documents[index]
    }

    /// Source groups involved in at least one cross-group pair.
    pub fn groups_with_cross_duplicates(&self) -> BTreeSet<&str> {
        self.pairs
            .iter()
            .filter(|p| p.is_cross_group())
            .flat_map(|p| [p.pair.i, p.pair.j])
            .map(|idx| self.documents[idx].source.as_str())
            .collect()
    }

    /// Exact duplicates whose two documents come from different source groups.
    pub fn exact_cross_group_pairs(&self) -> impl Iterator<Item = &ClassifiedPair> {
        self.pairs
            .iter()
            .filter(|p| p.exact_duplicate && p.is_cross_group())
    }

    /// Source groups holding the later document of an exact cross-group pair.
    pub fn removal_candidates(&self) -> BTreeSet<&str> {
        self.exact_cross_group_pairs()
            .map(|p| self.documents[p.pair.j].source.as_str())
            .collect()
    }
}

pub fn analyze(records: &[QuestionRecord], threshold: Number) -> Result<AnalysisResult, AnalysisError> {
    analyze_with(records, AnalysisOptions::new(threshold))
}

/// Builds the corpus, enumerates similar pairs and classifies them.
/// Thresholds are checked before any text is processed.
pub fn analyze_with(
    records: &[QuestionRecord],
    options: AnalysisOptions,
) -> Result<AnalysisResult, AnalysisError> {
    validate_threshold(options.threshold)?;
    validate_threshold(options.exact_threshold)?;

    let corpus = Corpus::build(records);
    let (pairs, timings) = search(&corpus, options.threshold, options.method)?;
    tracing::debug!(
        compare = ?timings.compare_duration,
        sort = ?timings.sort_duration,
        "Search timings"
    );

    let documents = corpus.documents().iter().map(|d| d.info.clone()).collect();
    Ok(AnalysisResult::classify(
        documents,
        pairs,
        options.threshold,
        options.exact_threshold,
    ))
}
