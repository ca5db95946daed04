pub mod file;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MonitorError;
use crate::profile::ProfileSnapshot;

/// Last accepted profile state for one account.
///
/// `display_name` is optional so records written before names were tracked
/// still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineRecord {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl BaselineRecord {
    pub fn from_snapshot(snapshot: &ProfileSnapshot) -> Self {
        Self {
            display_name: Some(snapshot.display_name.clone()),
            picture_url: snapshot.picture_url.clone(),
            saved_at: Utc::now(),
        }
    }

    /// True when name and picture are both identical to the snapshot.
    pub fn matches(&self, snapshot: &ProfileSnapshot) -> bool {
        self.display_name.as_deref() == Some(snapshot.display_name.as_str())
            && self.picture_url == snapshot.picture_url
    }
}

/// Per-account baseline persistence.
///
/// Implementations must make `save` an atomic overwrite: a reader sees either
/// the old record or the new one.
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn load(&self, account: &str) -> Result<Option<BaselineRecord>, MonitorError>;
    async fn save(&self, account: &str, record: &BaselineRecord) -> Result<(), MonitorError>;
}
