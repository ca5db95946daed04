//! In-process doubles for the network-facing traits.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::baseline::memory::MemoryBaselineStore;
use crate::baseline::{BaselineRecord, BaselineStore};
use crate::compare::ImageFetcher;
use crate::config::{Account, ChatTarget, Destination};
use crate::errors::MonitorError;
use crate::notify::Notifier;
use crate::profile::{ProfileSnapshot, ProfileSource};

pub fn snapshot(name: &str, pic: Option<&str>) -> ProfileSnapshot {
    ProfileSnapshot {
        display_name: name.to_string(),
        picture_url: pic.map(str::to_string),
    }
}

pub fn record(name: &str, pic: Option<&str>) -> BaselineRecord {
    BaselineRecord {
        display_name: Some(name.to_string()),
        picture_url: pic.map(str::to_string),
        saved_at: Utc::now(),
    }
}

pub fn account(name: &str, credential: &str) -> Account {
    Account {
        name: name.to_string(),
        credential: credential.to_string(),
        expected_name: None,
        expected_picture_url: None,
        destination: Destination {
            bot_token: "123:test".to_string(),
            chat: ChatTarget::Username(format!("@{}", name)),
        },
    }
}

/// Profiles keyed by credential.
#[derive(Default)]
pub struct FakeProfileSource {
    profiles: HashMap<String, Result<ProfileSnapshot, String>>,
    delay: Option<Duration>,
}

impl FakeProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, credential: &str, snapshot: ProfileSnapshot) -> Self {
        self.profiles.insert(credential.to_string(), Ok(snapshot));
        self
    }

    pub fn with_failure(mut self, credential: &str, reason: &str) -> Self {
        self.profiles
            .insert(credential.to_string(), Err(reason.to_string()));
        self
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ProfileSource for FakeProfileSource {
    async fn fetch_profile(&self, credential: &str) -> Result<ProfileSnapshot, MonitorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.profiles.get(credential) {
            Some(Ok(snapshot)) => Ok(snapshot.clone()),
            Some(Err(reason)) => Err(MonitorError::Upstream(reason.clone())),
            None => Err(MonitorError::Upstream("profile API error (401 Unauthorized)".into())),
        }
    }
}

/// Image bytes keyed by URL; unknown URLs behave like a 404.
#[derive(Default)]
pub struct FakeImageFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl FakeImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ImageFetcher for FakeImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MonitorError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| MonitorError::ImageFetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }
}

/// Memory store whose load or save can be made to fail.
pub struct FlakyBaselineStore {
    pub inner: MemoryBaselineStore,
    fail_load: bool,
    fail_save: bool,
}

impl FlakyBaselineStore {
    pub fn corrupt() -> Self {
        Self {
            inner: MemoryBaselineStore::new(),
            fail_load: true,
            fail_save: false,
        }
    }

    pub fn unwritable() -> Self {
        Self {
            inner: MemoryBaselineStore::new(),
            fail_load: false,
            fail_save: true,
        }
    }
}

#[async_trait]
impl BaselineStore for FlakyBaselineStore {
    async fn load(&self, account: &str) -> Result<Option<BaselineRecord>, MonitorError> {
        if self.fail_load {
            return Err(MonitorError::CorruptBaseline(format!(
                "cannot parse baseline_{}.json: EOF while parsing",
                account
            )));
        }
        self.inner.load(account).await
    }

    async fn save(&self, account: &str, record: &BaselineRecord) -> Result<(), MonitorError> {
        if self.fail_save {
            return Err(MonitorError::Persistence("read-only file system".into()));
        }
        self.inner.save(account, record).await
    }
}

/// Captures every message; destinations listed in `failing` reject delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(ChatTarget, String)>>,
    failing: Vec<ChatTarget>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, chat: ChatTarget) -> Self {
        self.failing.push(chat);
        self
    }

    pub async fn messages(&self) -> Vec<(ChatTarget, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, destination: &Destination, text: &str) -> Result<(), MonitorError> {
        if self.failing.contains(&destination.chat) {
            return Err(MonitorError::Delivery("chat not found".into()));
        }
        self.sent
            .lock()
            .await
            .push((destination.chat.clone(), text.to_string()));
        Ok(())
    }
}
