use crate::detector::Severity;

/// Failures that can occur while checking a single account.
///
/// None of these ever abort a cycle. The detector turns each one into a
/// finding, and delivery failures are only logged.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The profile API was unreachable, timed out, or returned garbage.
    #[error("profile source error: {0}")]
    Upstream(String),

    /// An image could not be downloaded.
    #[error("failed to fetch image {url}: {reason}")]
    ImageFetch { url: String, reason: String },

    /// An image was downloaded but could not be decoded or hashed.
    #[error("failed to hash image: {0}")]
    HashCompute(String),

    /// A stored baseline exists but cannot be parsed.
    #[error("corrupt baseline: {0}")]
    CorruptBaseline(String),

    /// Writing a baseline failed.
    #[error("failed to persist baseline: {0}")]
    Persistence(String),

    /// The notification could not be delivered.
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

impl MonitorError {
    /// Severity of the finding this error becomes.
    pub fn severity(&self) -> Severity {
        match self {
            MonitorError::Upstream(_) | MonitorError::Persistence(_) => Severity::Error,
            MonitorError::ImageFetch { .. }
            | MonitorError::HashCompute(_)
            | MonitorError::CorruptBaseline(_) => Severity::Warning,
            MonitorError::Delivery(_) => Severity::Info,
        }
    }
}
