//! Domain types shared by the fetcher, trainer and exporter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// One cleaned training row: non-blank trimmed text and a numeric label.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub text: String,
    pub label: f64,
}

/// Texts and labels kept as two order-aligned columns.
///
/// Index `i` of `texts` always belongs to index `i` of `labels`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub texts: Vec<String>,
    pub labels: Vec<f64>,
}

impl Dataset {
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut texts = Vec::with_capacity(records.len());
        let mut labels = Vec::with_capacity(records.len());
        for r in records {
            texts.push(r.text);
            labels.push(r.label);
        }
        Self { texts, labels }
    }

    pub fn len(&self) -> usize { self.texts.len() }

    pub fn is_empty(&self) -> bool { self.texts.is_empty() }
}

/// Embedding use-case sent with every request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    #[default]
    RetrievalQuery,
    RetrievalDocument,
    SemanticSimilarity,
    Classification,
    Clustering,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RetrievalQuery => "RETRIEVAL_QUERY",
            Self::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            Self::SemanticSimilarity => "SEMANTIC_SIMILARITY",
            Self::Classification => "CLASSIFICATION",
            Self::Clustering => "CLUSTERING",
        }
    }
}

/// Immutable embedding configuration handed to the fetcher and the service client.
///
/// `model`, `dimension` and `task_type` must match the serving side; the
/// exported head is only valid for vectors produced under the same triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub task_type: TaskType,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub rate_limit_backoff_ms: u64,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "gemini-embedding-001".to_string(),
            dimension: 768,
            task_type: TaskType::RetrievalQuery,
            chunk_size: 20,
            chunk_delay_ms: 1000,
            rate_limit_backoff_ms: 5000,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    pub fn chunk_delay(&self) -> Duration { Duration::from_millis(self.chunk_delay_ms) }

    pub fn rate_limit_backoff(&self) -> Duration { Duration::from_millis(self.rate_limit_backoff_ms) }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::InvalidConfig("embedding.model must not be empty".into()));
        }
        if self.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("embedding.chunk_size must be positive".into()));
        }
        Ok(())
    }
}

/// A fitted single-output affine layer: `rating = dot(embedding, W) + b`.
///
/// Serialises to the artifact format `{"W": [...], "b": x}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearHead {
    #[serde(rename = "W")]
    pub weights: Vec<f32>,
    #[serde(rename = "b")]
    pub bias: f32,
}

impl LinearHead {
    pub fn zeros(dimension: usize) -> Self { Self { weights: vec![0.0; dimension], bias: 0.0 } }

    pub fn dim(&self) -> usize { self.weights.len() }

    /// Score one embedding. The embedding must have exactly `dim()` entries.
    pub fn predict(&self, embedding: &[f32]) -> Result<f64> {
        if embedding.len() != self.weights.len() {
            return Err(Error::InvalidHead(format!(
                "expected {}-dim embedding, got {}",
                self.weights.len(),
                embedding.len()
            )));
        }
        Ok(self.predict_unchecked(embedding))
    }

    pub(crate) fn predict_unchecked(&self, embedding: &[f32]) -> f64 {
        let dot: f64 = embedding
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| f64::from(x) * f64::from(w))
            .sum();
        dot + f64::from(self.bias)
    }

    /// Mean squared and mean absolute error over `(embedding, label)` rows.
    ///
    /// Returns `None` when there are no rows to score.
    #[allow(clippy::cast_precision_loss)]
    pub fn mse_mae<'r, I>(&self, rows: I) -> Option<(f64, f64)>
    where
        I: IntoIterator<Item = (&'r [f32], f64)>,
    {
        let (mut n, mut se, mut ae) = (0usize, 0.0f64, 0.0f64);
        for (x, y) in rows {
            let err = self.predict_unchecked(x) - y;
            se += err * err;
            ae += err.abs();
            n += 1;
        }
        (n > 0).then(|| (se / n as f64, ae / n as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_is_dot_plus_bias() {
        let head = LinearHead { weights: vec![0.5, -1.0, 2.0], bias: 0.25 };
        let got = head.predict(&[1.0, 1.0, 1.0]).unwrap();
        assert!((got - 1.75).abs() < 1e-9);
    }

    #[test]
    fn predict_rejects_wrong_dimension() {
        let head = LinearHead::zeros(4);
        assert!(matches!(head.predict(&[1.0, 2.0]), Err(Error::InvalidHead(_))));
    }

    #[test]
    fn task_type_serializes_screaming_case() {
        let s = serde_json::to_string(&TaskType::RetrievalQuery).unwrap();
        assert_eq!(s, "\"RETRIEVAL_QUERY\"");
        assert_eq!(TaskType::RetrievalQuery.as_str(), "RETRIEVAL_QUERY");
    }

    #[test]
    fn mse_mae_of_empty_set_is_none() {
        assert!(LinearHead::zeros(2).mse_mae(std::iter::empty()).is_none());
        let x = [1.0f32, 0.0];
        let (mse, mae) = LinearHead::zeros(2).mse_mae([(&x[..], 2.0)]).unwrap();
        assert!((mse - 4.0).abs() < 1e-12);
        assert!((mae - 2.0).abs() < 1e-12);
    }
}
