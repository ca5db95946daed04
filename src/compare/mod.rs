pub mod digest;
pub mod phash;

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::{ComparisonConfig, ComparisonStrategy};
use crate::errors::MonitorError;
use phash::PerceptualHash;

/// Downloads image bytes by URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MonitorError>;
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::ImageFetch {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MonitorError> {
        let fetch_err = |reason: String| MonitorError::ImageFetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Outcome of comparing two pictures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PictureComparison {
    pub matched: bool,
    /// Only the perceptual strategy produces a score.
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageComparator {
    /// Byte-identical content (SHA-256).
    ExactDigest,
    /// Perceptual hash similarity at or above `threshold` percent.
    PerceptualHash { threshold: f64 },
}

impl ImageComparator {
    pub fn from_config(config: &ComparisonConfig) -> Self {
        match config.strategy {
            ComparisonStrategy::Digest => ImageComparator::ExactDigest,
            ComparisonStrategy::Perceptual => ImageComparator::PerceptualHash {
                threshold: config.threshold,
            },
        }
    }

    /// Download both pictures and compare them.
    pub async fn compare(
        &self,
        fetcher: &dyn ImageFetcher,
        reference_url: &str,
        current_url: &str,
    ) -> Result<PictureComparison, MonitorError> {
        let (reference, current) =
            tokio::try_join!(fetcher.fetch(reference_url), fetcher.fetch(current_url))?;

        match *self {
            ImageComparator::ExactDigest => {
                let matched = digest::sha256_hex(&reference) == digest::sha256_hex(&current);
                Ok(PictureComparison {
                    matched,
                    similarity: None,
                })
            }
            ImageComparator::PerceptualHash { threshold } => {
                // Decoding is CPU-bound; keep it off the async workers.
                let (a, b) = tokio::task::spawn_blocking(move || {
                    Ok::<_, MonitorError>((
                        PerceptualHash::from_bytes(&reference)?,
                        PerceptualHash::from_bytes(&current)?,
                    ))
                })
                .await
                .map_err(|e| MonitorError::HashCompute(format!("hashing task failed: {}", e)))??;

                let similarity = a.similarity(&b);
                debug!(
                    "Perceptual hashes {} / {} -> {:.2}%",
                    a.to_hex(),
                    b.to_hex(),
                    similarity
                );
                Ok(PictureComparison {
                    matched: phash::is_match(similarity, threshold),
                    similarity: Some(similarity),
                })
            }
        }
    }
}

impl std::fmt::Display for ImageComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageComparator::ExactDigest => write!(f, "exact digest"),
            ImageComparator::PerceptualHash { threshold } => {
                write!(f, "perceptual hash (threshold {}%)", threshold)
            }
        }
    }
}
