use std::future::Future;
use std::num::NonZeroUsize;

use lru::LruCache;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// Memoizes one-shot answers by a SHA-256 digest of the exact question bytes.
///
/// The lock is never held across `compute`, so two identical concurrent misses both
/// compute and the later write wins with the same answer.
pub struct AnswerCache {
    entries: Mutex<LruCache<String, String>>,
}

impl AnswerCache {
    /// `capacity == 0` keeps every answer for the lifetime of the process.
    pub fn new(capacity: usize) -> Self {
        let cache = match NonZeroUsize::new(capacity) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(cache),
        }
    }

    pub fn digest(question: &str) -> String {
        format!("{:x}", Sha256::digest(question.as_bytes()))
    }

    pub async fn get(&self, question: &str) -> Option<String> {
        let key = Self::digest(question);
        self.entries.lock().await.get(&key).cloned()
    }

    pub async fn get_or_compute<F, Fut>(&self, question: &str, compute: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let key = Self::digest(question);
        if let Some(answer) = self.entries.lock().await.get(&key).cloned() {
            debug!(key = %key, "answer cache hit");
            return Ok(answer);
        }

        debug!(key = %key, "answer cache miss");
        let answer = compute().await?;
        self.entries.lock().await.put(key, answer.clone());
        Ok(answer)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
