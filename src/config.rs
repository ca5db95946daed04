use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStrategy {
    #[default]
    Perceptual,
    Digest,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    #[serde(default = "default_monitor_config")]
    pub monitor: MonitorConfig,
    #[serde(default = "default_comparison_config")]
    pub comparison: ComparisonConfig,
    #[serde(default = "default_line_config")]
    pub line: LineConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Six-field cron expression; takes precedence over `interval_secs`.
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default = "default_true")]
    pub check_on_startup: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_baseline_dir")]
    pub baseline_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ComparisonConfig {
    #[serde(default)]
    pub strategy: ComparisonStrategy,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LineConfig {
    #[serde(default = "default_line_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    /// Default bot token for accounts that don't set their own
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Optional Bot API base URL override
    #[serde(default)]
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub name: String,
    pub channel_access_token: String,
    #[serde(default)]
    pub expected_name: Option<String>,
    #[serde(default)]
    pub expected_picture_url: Option<String>,
    pub chat_id: ChatTarget,
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Where a notification goes: a numeric chat id or a `@channel` username.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl std::fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{}", id),
            ChatTarget::Username(name) => write!(f, "{}", name),
        }
    }
}

/// Resolved notification destination for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub bot_token: String,
    pub chat: ChatTarget,
}

/// A monitored account, fully resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub credential: String,
    pub expected_name: Option<String>,
    pub expected_picture_url: Option<String>,
    pub destination: Destination,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_parallelism() -> usize {
    1
}

fn default_baseline_dir() -> PathBuf {
    PathBuf::from("baselines")
}

fn default_threshold() -> f64 {
    95.0
}

fn default_line_api_base_url() -> String {
    "https://api.line.me".to_string()
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind: default_bind(),
    }
}

fn default_monitor_config() -> MonitorConfig {
    MonitorConfig {
        interval_secs: default_interval_secs(),
        cron: None,
        check_on_startup: default_true(),
        request_timeout_secs: default_request_timeout_secs(),
        parallelism: default_parallelism(),
        baseline_dir: default_baseline_dir(),
    }
}

fn default_comparison_config() -> ComparisonConfig {
    ComparisonConfig {
        strategy: ComparisonStrategy::default(),
        threshold: default_threshold(),
    }
}

fn default_line_config() -> LineConfig {
    LineConfig {
        api_base_url: default_line_api_base_url(),
    }
}

impl MonitorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content).context("Failed to parse config file")?;

        // Hosting platforms hand out the listening port through PORT.
        if let Ok(port) = std::env::var("PORT") {
            config.server.bind = override_port(&config.server.bind, &port);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            anyhow::bail!("No accounts configured");
        }
        if !(0.0..=100.0).contains(&self.comparison.threshold) {
            anyhow::bail!(
                "comparison.threshold must be between 0 and 100, got {}",
                self.comparison.threshold
            );
        }
        if self.monitor.interval_secs == 0 {
            anyhow::bail!("monitor.interval_secs must be greater than 0");
        }
        if self.monitor.request_timeout_secs == 0 {
            anyhow::bail!("monitor.request_timeout_secs must be greater than 0");
        }
        if self.monitor.parallelism == 0 {
            anyhow::bail!("monitor.parallelism must be greater than 0");
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.name.trim().is_empty() {
                anyhow::bail!("Account with empty name");
            }
            if !seen.insert(account.name.as_str()) {
                anyhow::bail!("Duplicate account name: {}", account.name);
            }
            if account.channel_access_token.is_empty() {
                anyhow::bail!("Account '{}' has no channel_access_token", account.name);
            }
            if self.bot_token_for(account).is_none() {
                anyhow::bail!(
                    "Account '{}' has no bot_token and [telegram] bot_token is not set",
                    account.name
                );
            }
        }
        Ok(())
    }

    fn bot_token_for<'a>(&'a self, account: &'a AccountConfig) -> Option<&'a str> {
        account
            .bot_token
            .as_deref()
            .or(self.telegram.bot_token.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Accounts in configuration order, with bot tokens resolved.
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .filter_map(|a| {
                let bot_token = self.bot_token_for(a)?.to_string();
                Some(Account {
                    name: a.name.clone(),
                    credential: a.channel_access_token.clone(),
                    expected_name: a.expected_name.clone(),
                    expected_picture_url: a.expected_picture_url.clone(),
                    destination: Destination {
                        bot_token,
                        chat: a.chat_id.clone(),
                    },
                })
            })
            .collect()
    }
}

fn override_port(bind: &str, port: &str) -> String {
    let host = bind.rsplit_once(':').map(|(h, _)| h).unwrap_or(bind);
    format!("{}:{}", host, port.trim())
}
