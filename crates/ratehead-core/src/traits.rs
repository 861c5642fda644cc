use std::time::Duration;

use crate::error::ServiceError;
use crate::types::EmbeddingConfig;

/// A hosted (or stubbed) text embedding backend.
///
/// One call embeds one chunk. The returned list is aligned to `texts`; an
/// empty inner vector marks a row the service produced no values for.
pub trait EmbeddingService: Send + Sync {
    fn embed_chunk(
        &self,
        texts: &[String],
        config: &EmbeddingConfig,
    ) -> std::result::Result<Vec<Vec<f64>>, ServiceError>;
}

/// Blocking pause used for pacing and rate-limit backoff.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) { std::thread::sleep(duration) }
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) { (**self).sleep(duration) }
}
