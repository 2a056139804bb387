use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::{Number, MIN_TOKEN_CHARS};

pub type IdfTable = HashMap<String, Number>;

fn qualifies(token: &str) -> bool {
    token.chars().count() > MIN_TOKEN_CHARS
}

/// Sparse TF-IDF vector. Entries are kept in token order so that every
/// summation over them runs in the same order on every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    weights: BTreeMap<String, Number>,
    magnitude: Number,
}

impl SparseVector {
    pub fn from_weights(weights: BTreeMap<String, Number>) -> Self {
        let magnitude = weights.values().map(|w| w * w).sum::<Number>().sqrt();
        Self { weights, magnitude }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn get(&self, token: &str) -> Option<Number> {
        self.weights.get(token).copied()
    }

    pub fn magnitude(&self) -> Number {
        self.magnitude
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Number)> {
        self.weights.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

pub fn term_frequencies(normalized_text: &str) -> HashMap<String, usize> {
    let mut freq = HashMap::new();
    for token in normalized_text.split_whitespace().filter(|t| qualifies(t)) {
        *freq.entry(token.to_string()).or_insert(0) += 1;
    }
    freq
}

/// Smoothed inverse document frequency: `ln((N + 1) / (df + 1)) + 1`.
pub fn compute_idf<S: AsRef<str>>(documents: &[S]) -> IdfTable {
    let num_docs = documents.len() as Number;
    let mut doc_count: HashMap<&str, usize> = HashMap::new();

    for text in documents {
        let unique: HashSet<&str> = text
            .as_ref()
            .split_whitespace()
            .filter(|t| qualifies(t))
            .collect();
        for token in unique {
            *doc_count.entry(token).or_insert(0) += 1;
        }
    }

    doc_count
        .into_iter()
        .map(|(token, count)| {
            let weight = ((num_docs + 1.0) / (count as Number + 1.0)).ln() + 1.0;
            (token.to_string(), weight)
        })
        .collect()
}

pub fn vectorize(normalized_text: &str, idf: &IdfTable) -> SparseVector {
    let freq = term_frequencies(normalized_text);
    let total: usize = freq.values().sum();
    if total == 0 {
        return SparseVector::default();
    }

    let weights = freq
        .into_iter()
        .map(|(token, count)| {
            let tf = count as Number / total as Number;
            let weight = tf * idf.get(&token).copied().unwrap_or(0.0);
            (token, weight)
        })
        .collect();
    SparseVector::from_weights(weights)
}

/// Cosine similarity of two sparse vectors. Empty or zero-magnitude inputs
/// give 0. The result is not clamped and may exceed 1.0 by rounding error.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> Number {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let dot_product: Number = small
        .iter()
        .filter_map(|(token, w)| large.get(token).map(|other| w * other))
        .sum();

    if a.magnitude <= 0.0 || b.magnitude <= 0.0 {
        return 0.0;
    }
    dot_product / (a.magnitude * b.magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EPSILON;

    fn vector_of(text: &str, corpus: &[&str]) -> SparseVector {
        vectorize(text, &compute_idf(corpus))
    }

    #[test]
    fn term_frequencies_ignore_short_tokens() {
        let freq = term_frequencies("el gato y el gato negro ok");
        assert_eq!(freq.get("gato"), Some(&2));
        assert_eq!(freq.get("negro"), Some(&1));
        assert!(!freq.contains_key("el"));
        assert!(!freq.contains_key("ok"));
        assert_eq!(freq.len(), 2);
    }

    #[test]
    fn token_length_counts_characters_not_bytes() {
        // "ñú" is two characters but four bytes.
        let freq = term_frequencies("ñú año");
        assert!(!freq.contains_key("ñú"));
        assert_eq!(freq.get("año"), Some(&1));
    }

    #[test]
    fn idf_uses_smoothed_formula() {
        let idf = compute_idf(&["alpha beta", "alpha gamma", "delta"]);
        let expected_alpha = (4.0_f64 / 3.0).ln() + 1.0;
        let expected_beta = (4.0_f64 / 2.0).ln() + 1.0;
        assert!((idf["alpha"] - expected_alpha).abs() < EPSILON);
        assert!((idf["beta"] - expected_beta).abs() < EPSILON);
        assert_eq!(idf.len(), 4);
    }

    #[test]
    fn idf_is_positive_even_when_token_is_everywhere() {
        let idf = compute_idf(&["shared word", "shared word", "shared word"]);
        assert!(idf.values().all(|&w| w > 0.0));
        // ln(1) + 1
        assert!((idf["shared"] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn idf_counts_each_document_once() {
        let idf = compute_idf(&["echo echo echo", "other"]);
        let expected = (3.0_f64 / 2.0).ln() + 1.0;
        assert!((idf["echo"] - expected).abs() < EPSILON);
    }

    #[test]
    fn vectorize_degenerate_document_is_empty() {
        let idf = compute_idf(&["a b cd", "real words here"]);
        assert!(vectorize("a b cd", &idf).is_empty());
        assert!(vectorize("", &idf).is_empty());
    }

    #[test]
    fn vectorize_weights_are_tf_times_idf() {
        let idf = compute_idf(&["uno uno dos", "dos tres"]);
        let vector = vectorize("uno uno dos", &idf);
        let expected_uno = (2.0 / 3.0) * idf["uno"];
        let expected_dos = (1.0 / 3.0) * idf["dos"];
        assert!((vector.get("uno").unwrap() - expected_uno).abs() < EPSILON);
        assert!((vector.get("dos").unwrap() - expected_dos).abs() < EPSILON);
        assert_eq!(vector.get("tres"), None);
    }

    #[test]
    fn vectorize_unknown_tokens_get_zero_weight() {
        let vector = vectorize("unseen token", &IdfTable::new());
        assert_eq!(vector.get("unseen"), Some(0.0));
        assert_eq!(vector.magnitude(), 0.0);
    }

    #[test]
    fn cosine_empty_vector_is_exactly_zero() {
        let v = vector_of("some words here", &["some words here"]);
        let empty = SparseVector::default();
        assert_eq!(cosine_similarity(&empty, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &empty), 0.0);
        assert_eq!(cosine_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn cosine_zero_magnitude_is_zero() {
        let zero = vectorize("unseen token", &IdfTable::new());
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn cosine_self_similarity_is_one() {
        let corpus = ["the quick brown fox jumps", "lazy dogs sleep all day"];
        let v = vector_of(corpus[0], &corpus);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn cosine_is_symmetric_and_bounded() {
        let corpus = [
            "rust ownership borrowing lifetimes",
            "rust borrowing checker rules",
            "python garbage collector",
            "ownership rules rust rust",
        ];
        let idf = compute_idf(&corpus);
        let vectors: Vec<_> = corpus.iter().map(|t| vectorize(t, &idf)).collect();
        for a in &vectors {
            for b in &vectors {
                let ab = cosine_similarity(a, b);
                assert_eq!(ab, cosine_similarity(b, a));
                assert!(ab >= 0.0);
                assert!(ab <= 1.0 + EPSILON);
            }
        }
    }

    #[test]
    fn cosine_disjoint_vectors_is_zero() {
        let corpus = ["alpha beta gamma", "delta epsilon zeta"];
        let idf = compute_idf(&corpus);
        let a = vectorize(corpus[0], &idf);
        let b = vectorize(corpus[1], &idf);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn magnitude_covers_all_entries() {
        let mut weights = BTreeMap::new();
        weights.insert("aaa".to_string(), 3.0);
        weights.insert("bbb".to_string(), 4.0);
        let a = SparseVector::from_weights(weights);
        assert!((a.magnitude() - 5.0).abs() < EPSILON);

        let mut weights = BTreeMap::new();
        weights.insert("aaa".to_string(), 1.0);
        let b = SparseVector::from_weights(weights);
        // dot = 3, |a| = 5, |b| = 1
        assert!((cosine_similarity(&a, &b) - 0.6).abs() < EPSILON);
    }
}
