//! Artifact storage for rendered waivers.
//!
//! [`ArtifactStore`] is the raw object-store seam; [`ArtifactUploader`]
//! wraps one with validation, name sanitizing, the pre-flight listing and
//! retry with exponential backoff.

pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use http::HttpArtifactStore;

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Characters not allowed in object names.
const UNSAFE_NAME_CHARS: &str = r"[^A-Za-z0-9._-]+";

/// Errors raised by artifact storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The artifact was rejected before any network call.
    #[error("artifact rejected: {0}")]
    Invalid(String),

    /// The destination bucket does not exist.
    #[error("storage location missing: {0}")]
    LocationMissing(String),

    /// A failure worth retrying: network error, timeout, 5xx or 429.
    #[error("transient storage failure: {0}")]
    Transient(String),

    /// The store refused the request.
    #[error("storage request failed ({status}): {message}")]
    Permanent {
        /// HTTP status.
        status: u16,
        /// Message reported by the store.
        message: String,
    },

    /// Every attempt failed transiently.
    #[error("upload failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The final failure.
        last: Box<StoreError>,
    },
}

impl StoreError {
    /// Classify an unsuccessful HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 | 500..=599 => Self::Transient(format!("HTTP {status}: {message}")),
            _ => Self::Permanent { status, message },
        }
    }

    /// Whether retrying might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Raw object storage.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// List object names under `prefix` in the configured bucket.
    ///
    /// Fails with [`StoreError::LocationMissing`] if the bucket is absent.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Store `bytes` at `path`, replacing any existing object, and return
    /// its public address.
    async fn put(&self, path: &str, content_type: &str, bytes: Vec<u8>)
        -> Result<String, StoreError>;
}

/// Exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits, for tests and dry runs.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Validating, retrying uploader.
#[derive(Clone)]
pub struct ArtifactUploader {
    store: Arc<dyn ArtifactStore>,
    prefix: String,
    max_bytes: usize,
    retry: RetryPolicy,
    unsafe_chars: Regex,
}

impl std::fmt::Debug for ArtifactUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactUploader")
            .field("prefix", &self.prefix)
            .field("max_bytes", &self.max_bytes)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ArtifactUploader {
    /// Create an uploader storing objects under `prefix`.
    ///
    /// # Panics
    ///
    /// Panics only if the built-in name pattern fails to compile.
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        prefix: impl Into<String>,
        max_bytes: usize,
        retry: RetryPolicy,
    ) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();
        Self {
            store,
            prefix,
            max_bytes,
            retry,
            unsafe_chars: Regex::new(UNSAFE_NAME_CHARS).expect("name pattern compiles"),
        }
    }

    /// The retry schedule in use.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Replace disallowed characters in `name` with `_`.
    #[must_use]
    pub fn sanitize_name(&self, name: &str) -> String {
        let cleaned = self.unsafe_chars.replace_all(name.trim(), "_");
        let cleaned = cleaned.trim_start_matches('.');
        if cleaned.is_empty() {
            "artifact".to_string()
        } else {
            cleaned.to_string()
        }
    }

    /// Full object path for `name`.
    #[must_use]
    pub fn object_path(&self, name: &str) -> String {
        let name = self.sanitize_name(name);
        if self.prefix.is_empty() {
            name
        } else {
            format!("{}/{name}", self.prefix)
        }
    }

    /// Check an artifact before it is sent anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] describing the problem.
    pub fn check(&self, content_type: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::Invalid("artifact is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(StoreError::Invalid(format!(
                "artifact is {} bytes, limit is {}",
                bytes.len(),
                self.max_bytes
            )));
        }
        if content_type != crate::render::PDF_CONTENT_TYPE {
            return Err(StoreError::Invalid(format!(
                "unsupported content type {content_type}"
            )));
        }
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(StoreError::Invalid("artifact is not a PDF".to_string()));
        }
        Ok(())
    }

    /// Upload an artifact and return its public address.
    ///
    /// Transient failures are retried according to the [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// - [`StoreError::Invalid`] if the artifact fails [`check`](Self::check)
    /// - [`StoreError::LocationMissing`] if the bucket does not exist
    /// - [`StoreError::Permanent`] if the store refuses the upload
    /// - [`StoreError::Exhausted`] if every attempt failed transiently
    pub async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        self.check(content_type, bytes)?;
        let path = self.object_path(name);

        match self.store.list(&self.prefix).await {
            Ok(existing) => {
                debug!(prefix = %self.prefix, objects = existing.len(), "Listed destination");
            }
            Err(e @ StoreError::LocationMissing(_)) => return Err(e),
            Err(e) => {
                warn!(
                    prefix = %self.prefix,
                    error = %e,
                    "Listing destination failed, uploading anyway"
                );
            }
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.put(&path, content_type, bytes.to_vec()).await {
                Ok(url) => {
                    info!(path = %path, attempt, bytes = bytes.len(), "Uploaded artifact");
                    return Ok(url);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        path = %path,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        path = %path,
                        attempts = attempt,
                        error = %e,
                        "Upload attempts exhausted"
                    );
                    return Err(StoreError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Upload refused");
                    return Err(e);
                }
            }
        }
    }
}
