//! Chunked, paced, rate-limit-retrying embedding fetch.
//!
//! Texts are sent in contiguous chunks of at most `chunk_size`, strictly in
//! order and one request at a time. A rate-limit response sleeps for the
//! fixed backoff and retries the same chunk; any other service error aborts
//! the whole fetch. Every returned vector is checked and L2-normalised so the
//! output stays positionally aligned with the input.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use ratehead_core::error::{Error, Result, ServiceError};
use ratehead_core::normalize::normalize_embedding;
use ratehead_core::traits::{EmbeddingService, Sleeper, ThreadSleeper};
use ratehead_core::types::EmbeddingConfig;

pub mod fake;
pub mod gemini;

pub use fake::HashingEmbedder;
pub use gemini::{api_key_from_env, GeminiClient};

/// Pick the embedding backend for this process.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` selects the offline [`HashingEmbedder`];
/// otherwise a [`GeminiClient`] is built from the environment credential.
pub fn get_default_service(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingService>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake {
        info!("🧪 Using HashingEmbedder");
        return Ok(Box::new(HashingEmbedder));
    }
    let key = api_key_from_env()?;
    Ok(Box::new(GeminiClient::new(&key, config)?))
}

pub struct EmbeddingFetcher<'a, S: ?Sized, Z = ThreadSleeper> {
    service: &'a S,
    sleeper: Z,
    config: &'a EmbeddingConfig,
}

impl<'a, S: EmbeddingService + ?Sized> EmbeddingFetcher<'a, S, ThreadSleeper> {
    pub fn new(service: &'a S, config: &'a EmbeddingConfig) -> Self {
        Self { service, sleeper: ThreadSleeper, config }
    }
}

impl<'a, S: EmbeddingService + ?Sized, Z: Sleeper> EmbeddingFetcher<'a, S, Z> {
    pub fn with_sleeper(service: &'a S, config: &'a EmbeddingConfig, sleeper: Z) -> Self {
        Self { service, sleeper, config }
    }

    /// Embed `texts` into unit-norm vectors, one per text, in input order.
    pub fn fetch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.config.validate()?;
        let n = texts.len();
        let chunk_size = self.config.chunk_size;
        info!(
            "Embedding {} texts ({}, dim={}, task={})",
            n,
            self.config.model,
            self.config.dimension,
            self.config.task_type.as_str()
        );

        let pb = ProgressBar::new(n.div_ceil(chunk_size) as u64);
        pb.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} chunks")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut out = Vec::with_capacity(n);
        for (chunk_index, chunk) in texts.chunks(chunk_size).enumerate() {
            let start = chunk_index * chunk_size;
            let end = start + chunk.len();
            info!("  Embedding rows {}-{} of {}...", start + 1, end, n);

            let raw = self.embed_with_retry(chunk)?;
            self.append_chunk(&mut out, raw, start, chunk.len())?;
            pb.inc(1);

            if end < n {
                self.sleeper.sleep(self.config.chunk_delay());
            }
        }
        pb.finish_and_clear();
        Ok(out)
    }

    /// Retry one chunk until it succeeds or fails with a non-rate-limit error.
    fn embed_with_retry(&self, chunk: &[String]) -> Result<Vec<Vec<f64>>> {
        let backoff = self.config.rate_limit_backoff();
        loop {
            match self.service.embed_chunk(chunk, self.config) {
                Ok(raw) => return Ok(raw),
                Err(ServiceError::RateLimited) => {
                    warn!("  Rate limited. Waiting {:.0}s then retrying...", backoff.as_secs_f64());
                    self.sleeper.sleep(backoff);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn append_chunk(&self, out: &mut Vec<Vec<f32>>, raw: Vec<Vec<f64>>, start: usize, expected: usize) -> Result<()> {
        if raw.len() > expected {
            return Err(ServiceError::Decode(format!(
                "service returned {} embeddings for {} texts",
                raw.len(),
                expected
            ))
            .into());
        }
        let dimension = self.config.dimension;
        let mut raw = raw.into_iter();
        for offset in 0..expected {
            let row = start + offset;
            let values = match raw.next() {
                Some(v) if !v.is_empty() => v,
                _ => return Err(Error::EmptyEmbedding { row }),
            };
            if values.len() != dimension {
                return Err(Error::DimensionMismatch { row, expected: dimension, actual: values.len() });
            }
            out.push(normalize_embedding(&values));
        }
        debug!("  Appended rows {}..{}", start, start + expected);
        Ok(())
    }
}
