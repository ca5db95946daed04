use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{BaselineRecord, BaselineStore};
use crate::compare::digest::sha256_hex;
use crate::errors::MonitorError;

/// One pretty-printed JSON file per account inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path_for(&self, account: &str) -> PathBuf {
        self.dir
            .join(format!("baseline_{}.json", sanitize_file_stem(account)))
    }
}

/// Keep account names from escaping the store directory. Names that need
/// rewriting get a digest of the raw name appended after a `.`, which the
/// rewritten part never contains, so distinct names never share a file.
fn sanitize_file_stem(account: &str) -> String {
    let cleaned: String = account
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned == account {
        return cleaned;
    }
    let digest = sha256_hex(account.as_bytes());
    format!("{}.{}", cleaned, &digest[..16])
}

#[async_trait]
impl BaselineStore for JsonFileStore {
    async fn load(&self, account: &str) -> Result<Option<BaselineRecord>, MonitorError> {
        let path = self.path_for(account);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MonitorError::CorruptBaseline(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let record = serde_json::from_str(&content).map_err(|e| {
            MonitorError::CorruptBaseline(format!("cannot parse {}: {}", path.display(), e))
        })?;
        debug!("Loaded baseline for {} from {}", account, path.display());
        Ok(Some(record))
    }

    async fn save(&self, account: &str, record: &BaselineRecord) -> Result<(), MonitorError> {
        let path = self.path_for(account);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| MonitorError::Persistence(format!("cannot serialize baseline: {}", e)))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            MonitorError::Persistence(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        // Write beside the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            MonitorError::Persistence(format!("cannot write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            MonitorError::Persistence(format!("cannot replace {}: {}", path.display(), e))
        })?;

        info!("Saved baseline for {} to {}", account, path.display());
        Ok(())
    }
}
