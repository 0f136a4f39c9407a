//! Local lexical search over a markdown policy document.
//!
//! Sections are split at `## ` headings and ranked against a query by the
//! cosine similarity of their L2-normalised term-frequency vectors. No model
//! or external index is involved, so results are fully reproducible.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::evaluation::round3;

pub const DEFAULT_TOP_K: usize = 3;

const HEADING_MARKER: &str = "## ";

/// A section of a policy document, optionally annotated with a search score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyChunk {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Raised when a policy document exists but cannot be read.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("policy document {} unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Split a document into heading-delimited sections.
pub fn split_chunks(text: &str) -> Vec<PolicyChunk> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut sections: Vec<Vec<&str>> = vec![Vec::new()];
    for (index, line) in trimmed.split('\n').enumerate() {
        if index > 0 && line.starts_with(HEADING_MARKER) {
            sections.push(Vec::new());
        }
        if let Some(current) = sections.last_mut() {
            current.push(line);
        }
    }

    sections
        .into_iter()
        .enumerate()
        .map(|(index, lines)| {
            let ordinal = index + 1;
            let title = lines
                .first()
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| {
                    line.starts_with(HEADING_MARKER) && line.len() > HEADING_MARKER.len()
                })
                .map(str::to_string)
                .unwrap_or_else(|| format!("Section {ordinal}"));

            PolicyChunk {
                id: format!("chunk_{ordinal}"),
                title,
                text: lines.join("\n").trim().to_string(),
                score: None,
            }
        })
        .collect()
}

/// Sparse, unit-length term-frequency vector.
///
/// Terms are kept sorted so sums run in a fixed order and equal inputs give
/// bit-identical scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: BTreeMap<String, f64>,
}

impl TermVector {
    pub fn from_text(text: &str) -> Self {
        let mut weights: BTreeMap<String, f64> = BTreeMap::new();
        for token in tokenize(text) {
            *weights.entry(token).or_insert(0.0) += 1.0;
        }

        let norm = weights.values().map(|count| count * count).sum::<f64>().sqrt();
        let norm = if norm > 0.0 { norm } else { 1.0 };
        for weight in weights.values_mut() {
            *weight /= norm;
        }

        Self { weights }
    }

    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Dot product of two normalised vectors, walking the sparser side.
    pub fn cosine(&self, other: &TermVector) -> f64 {
        let (sparse, dense) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };

        sparse
            .weights
            .iter()
            .filter_map(|(term, weight)| dense.weights.get(term).map(|other| weight * other))
            .sum()
    }
}

/// Lowercased runs of ASCII letters and digits.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Rank the sections of `document` against `query`, keeping the best `top_k`.
///
/// Ties keep document order.
pub fn rank_chunks(document: &str, query: &str, top_k: usize) -> Vec<PolicyChunk> {
    let query_vector = TermVector::from_text(query);

    let mut scored: Vec<(f64, PolicyChunk)> = split_chunks(document)
        .into_iter()
        .map(|chunk| {
            let score = query_vector.cosine(&TermVector::from_text(&chunk.text));
            (score, chunk)
        })
        .collect();
    scored.sort_by(|left, right| right.0.total_cmp(&left.0));

    scored
        .into_iter()
        .take(top_k)
        .map(|(score, chunk)| PolicyChunk {
            score: Some(round3(score)),
            ..chunk
        })
        .collect()
}

/// File-backed policy search. The document is read on every call.
#[derive(Debug, Clone)]
pub struct PolicyRetriever {
    path: PathBuf,
    top_k: usize,
}

impl PolicyRetriever {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Search the document; a missing file yields no excerpts rather than an error.
    pub fn search(&self, query: &str) -> Result<Vec<PolicyChunk>, RetrievalError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "policy document missing; no excerpts");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(RetrievalError::Unavailable {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let document = String::from_utf8_lossy(&bytes);
        Ok(rank_chunks(&document, query, self.top_k))
    }
}

/// Convenience wrapper over [`PolicyRetriever`].
pub fn search_policy(
    query: &str,
    policy_path: &Path,
    top_k: usize,
) -> Result<Vec<PolicyChunk>, RetrievalError> {
    PolicyRetriever::new(policy_path)
        .with_top_k(top_k)
        .search(query)
}
