use serde::Serialize;
use std::time::Instant;

use crate::record::QuestionRecord;
use crate::text::{assemble, normalize};
use crate::vector_ops::{compute_idf, vectorize, IdfTable, SparseVector};

/// Per-document metadata carried into the analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    /// Position of the originating record in the caller's input.
    pub record_index: usize,
    pub source: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

pub struct Document {
    pub info: DocumentInfo,
    pub raw_text: String,
    pub normalized_text: String,
    pub vector: SparseVector,
}

/// All documents of one run, vectorized against a single shared IDF table.
pub struct Corpus {
    documents: Vec<Document>,
    idf: IdfTable,
}

impl Corpus {
    /// Assembles and normalizes every record, then computes the IDF table once
    /// and vectorizes each document against it. Records whose normalized text
    /// is empty are left out.
    pub fn build(records: &[QuestionRecord]) -> Self {
        let start = Instant::now();

        let prepared: Vec<(usize, String, String)> = records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                let raw = assemble(record);
                let normalized = normalize(&raw);
                if normalized.is_empty() {
                    tracing::debug!(record = idx, name = %record.name, "Dropping record with no text");
                    None
                } else {
                    Some((idx, raw, normalized))
                }
            })
            .collect();

        let dropped = records.len() - prepared.len();
        if dropped > 0 {
            tracing::info!(dropped, "Records without comparable text were skipped");
        }

        let idf = {
            let texts: Vec<&str> = prepared.iter().map(|(_, _, n)| n.as_str()).collect();
            compute_idf(&texts)
        };

        let documents: Vec<Document> = prepared
            .into_iter()
            .map(|(idx, raw_text, normalized_text)| {
                let record = &records[idx];
                let vector = vectorize(&normalized_text, &idf);
                if vector.is_empty() {
                    tracing::debug!(record = idx, name = %record.name, "Document has no qualifying tokens");
                }
                Document {
                    info: DocumentInfo {
                        record_index: idx,
                        source: record.source.clone(),
                        name: record.name.clone(),
                        kind: record.kind.clone(),
                    },
                    raw_text,
                    normalized_text,
                    vector,
                }
            })
            .collect();

        tracing::info!(
            documents = documents.len(),
            vocabulary = idf.len(),
            elapsed = ?start.elapsed(),
            "Corpus built"
        );

        Self { documents, idf }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn vector(&self, index: usize) -> &SparseVector {
        &self.documents[index].vector
    }

    pub fn idf(&self) -> &IdfTable {
        &self.idf
    }
}
