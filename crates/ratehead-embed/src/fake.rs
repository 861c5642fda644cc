use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use ratehead_core::error::ServiceError;
use ratehead_core::traits::EmbeddingService;
use ratehead_core::types::EmbeddingConfig;

/// Offline embedder: feature-hashes whitespace tokens into `dimension` buckets.
///
/// Deterministic per text and never rate limited. Output is not normalised;
/// the fetcher does that like it would for the hosted service.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub fn embed_text(text: &str, dim: usize) -> Vec<f64> {
        let mut v = vec![0f64; dim];
        if dim == 0 {
            return v;
        }
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % dim as u64).unwrap_or(0);
            let val = f64::from((h >> 32) as u32) / f64::from(u32::MAX);
            v[idx] += val + (i % 3) as f64 * 0.01;
        }
        v
    }
}

impl EmbeddingService for HashingEmbedder {
    fn embed_chunk(&self, texts: &[String], config: &EmbeddingConfig) -> Result<Vec<Vec<f64>>, ServiceError> {
        Ok(texts.iter().map(|t| Self::embed_text(t, config.dimension)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let a = HashingEmbedder::embed_text("hello world", 32);
        let b = HashingEmbedder::embed_text("Hello  world", 32);
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
        assert!(a.iter().any(|&x| x > 0.0));
        assert_ne!(a, HashingEmbedder::embed_text("goodbye world", 32));
    }
}
