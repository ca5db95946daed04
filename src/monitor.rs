use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::Account;
use crate::detector::{ChangeDetector, CheckReport, CheckState, Finding, FindingKind, Severity};
use crate::notify::{self, Notifier};

/// Drives the change detector over every configured account and sends one
/// notification per account.
pub struct Monitor {
    accounts: Vec<Account>,
    detector: ChangeDetector,
    notifier: Arc<dyn Notifier>,
    parallelism: usize,
    cycle_lock: Mutex<()>,
}

impl Monitor {
    pub fn new(
        accounts: Vec<Account>,
        detector: ChangeDetector,
        notifier: Arc<dyn Notifier>,
        parallelism: usize,
    ) -> Self {
        Self {
            accounts,
            detector,
            notifier,
            parallelism: parallelism.max(1),
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Run one full check cycle. A trigger that arrives while a cycle is in
    /// progress waits for it to finish. Reports come back in account order.
    pub async fn run_check_cycle(&self) -> Vec<CheckReport> {
        let _guard = self.cycle_lock.lock().await;
        info!("Starting check cycle for {} account(s)", self.accounts.len());

        let reports: Vec<CheckReport> = stream::iter(self.accounts.clone())
            .map(|account| async move { self.check_account(&account).await })
            .buffered(self.parallelism)
            .collect()
            .await;

        let changed = reports.iter().filter(|r| r.has_changes()).count();
        let troubled = reports.iter().filter(|r| r.has_errors()).count();
        let failed = reports
            .iter()
            .filter(|r| r.state == CheckState::Failed)
            .count();
        info!(
            "Check cycle finished: {} account(s), {} with changes, {} with warnings, {} failed",
            reports.len(),
            changed,
            troubled,
            failed
        );
        reports
    }

    async fn check_account(&self, account: &Account) -> CheckReport {
        info!("Checking account: {}", account.name);

        // Run on its own task so a panic stays inside this account.
        let detector = self.detector.clone();
        let owned = account.clone();
        let report = match tokio::spawn(async move { detector.check(&owned).await }).await {
            Ok(report) => report,
            Err(e) => {
                error!("[{}] Check task aborted: {}", account.name, e);
                CheckReport {
                    account: account.name.clone(),
                    state: CheckState::Failed,
                    findings: vec![Finding {
                        kind: FindingKind::CheckAborted,
                        severity: Severity::Error,
                        message: format!("Check aborted unexpectedly: {}", e),
                    }],
                    snapshot: None,
                    baseline_written: false,
                }
            }
        };

        let text = notify::format_message(&account.name, &report.findings);
        if let Err(e) = self.notifier.notify(&account.destination, &text).await {
            error!("[{}] {}", account.name, e);
        }

        info!(
            "Checked account: {} ({:?}, name {:?}, {} finding(s), baseline written: {})",
            account.name,
            report.state,
            report.snapshot.as_ref().map(|s| s.display_name.as_str()),
            report.findings.len(),
            report.baseline_written
        );
        report
    }
}

/// One line per account, for the HTTP trigger's response body.
pub fn summarize(reports: &[CheckReport]) -> String {
    reports
        .iter()
        .map(|r| {
            let findings: Vec<String> = r.findings.iter().map(|f| f.to_string()).collect();
            format!("[{}] {}", r.account, findings.join(" | "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
