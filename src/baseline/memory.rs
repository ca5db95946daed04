use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{BaselineRecord, BaselineStore};
use crate::errors::MonitorError;

/// In-process baseline store (for testing). Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBaselineStore {
    records: Mutex<HashMap<String, BaselineRecord>>,
    saves: Mutex<usize>,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, account: &str, record: BaselineRecord) {
        self.records
            .lock()
            .await
            .insert(account.to_string(), record);
    }

    pub async fn get(&self, account: &str) -> Option<BaselineRecord> {
        self.records.lock().await.get(account).cloned()
    }

    /// Number of successful `save` calls so far.
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl BaselineStore for MemoryBaselineStore {
    async fn load(&self, account: &str) -> Result<Option<BaselineRecord>, MonitorError> {
        Ok(self.get(account).await)
    }

    async fn save(&self, account: &str, record: &BaselineRecord) -> Result<(), MonitorError> {
        self.insert(account, record.clone()).await;
        *self.saves.lock().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryBaselineStore::new();
        assert!(store.load("a").await.unwrap().is_none());

        let record = BaselineRecord {
            display_name: Some("Bot1".into()),
            picture_url: None,
            saved_at: Utc::now(),
        };
        store.save("a", &record).await.unwrap();

        assert_eq!(store.load("a").await.unwrap(), Some(record));
        assert!(store.load("b").await.unwrap().is_none());
        assert_eq!(store.save_count().await, 1);
    }
}
