pub mod telegram;

use async_trait::async_trait;

use crate::config::Destination;
use crate::detector::Finding;
use crate::errors::MonitorError;

/// Delivers a formatted report to an account's destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, destination: &Destination, text: &str) -> Result<(), MonitorError>;
}

/// Header line with the account label, then one line per finding in
/// detection order.
pub fn format_message(account: &str, findings: &[Finding]) -> String {
    let mut message = format!("📢 [{}]", account);
    for finding in findings {
        message.push('\n');
        message.push_str(&finding.to_string());
    }
    message
}
