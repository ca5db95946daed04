use std::sync::Arc;
use tracing::{debug, warn};

use crate::baseline::{BaselineRecord, BaselineStore};
use crate::compare::{ImageComparator, ImageFetcher};
use crate::config::Account;
use crate::errors::MonitorError;
use crate::profile::{ProfileSnapshot, ProfileSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Ok,
    Changed,
    Warning,
    Error,
}

impl Severity {
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Info => "📸",
            Severity::Ok => "✅",
            Severity::Changed => "🔄",
            Severity::Warning => "⚠️",
            Severity::Error => "❌",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    ProfileUnavailable,
    BaselineCorrupt,
    BaselineAutoSaved,
    NameChanged,
    PictureAdded,
    PictureRemoved,
    PictureMatches,
    PictureChanged,
    ComparisonFailed,
    PersistFailed,
    CheckAborted,
    Unchanged,
}

/// One observation from checking one account.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn new(kind: FindingKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }

    fn from_error(kind: FindingKind, context: &str, err: &MonitorError) -> Self {
        Self::new(kind, err.severity(), format!("{}: {}", context, err))
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.severity.marker(), self.message)
    }
}

/// Progress of one account through a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Start,
    ProfileFetched,
    BaselineResolved,
    Compared,
    Reported,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub account: String,
    pub state: CheckState,
    pub findings: Vec<Finding>,
    pub snapshot: Option<ProfileSnapshot>,
    pub baseline_written: bool,
}

impl CheckReport {
    pub fn has_changes(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity == Severity::Changed)
    }

    pub fn has_errors(&self) -> bool {
        self.findings
            .iter()
            .any(|f| matches!(f.severity, Severity::Warning | Severity::Error))
    }
}

/// Which value a comparison was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    Expected,
    Previous,
}

struct CheckRun {
    account: String,
    state: CheckState,
    findings: Vec<Finding>,
    baseline_written: bool,
}

impl CheckRun {
    fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            state: CheckState::Start,
            findings: Vec::new(),
            baseline_written: false,
        }
    }

    fn advance(&mut self, next: CheckState) {
        debug!("[{}] {:?} -> {:?}", self.account, self.state, next);
        self.state = next;
    }

    fn push(&mut self, finding: Finding) {
        if matches!(finding.severity, Severity::Warning | Severity::Error) {
            warn!("[{}] {}", self.account, finding.message);
        } else {
            debug!("[{}] {}", self.account, finding.message);
        }
        self.findings.push(finding);
    }

    fn finish(self, snapshot: Option<ProfileSnapshot>) -> CheckReport {
        CheckReport {
            account: self.account,
            state: self.state,
            findings: self.findings,
            snapshot,
            baseline_written: self.baseline_written,
        }
    }
}

/// Runs one account through fetch, baseline resolution, comparison and
/// baseline update. Never fails: every error ends up as a finding.
#[derive(Clone)]
pub struct ChangeDetector {
    profiles: Arc<dyn ProfileSource>,
    baselines: Arc<dyn BaselineStore>,
    images: Arc<dyn ImageFetcher>,
    comparator: ImageComparator,
}

impl ChangeDetector {
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        baselines: Arc<dyn BaselineStore>,
        images: Arc<dyn ImageFetcher>,
        comparator: ImageComparator,
    ) -> Self {
        Self {
            profiles,
            baselines,
            images,
            comparator,
        }
    }

    pub async fn check(&self, account: &Account) -> CheckReport {
        let mut run = CheckRun::new(&account.name);

        let snapshot = match self.profiles.fetch_profile(&account.credential).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                run.push(Finding::from_error(
                    FindingKind::ProfileUnavailable,
                    "Could not fetch profile",
                    &e,
                ));
                run.advance(CheckState::Failed);
                return run.finish(None);
            }
        };
        run.advance(CheckState::ProfileFetched);

        let previous = self.resolve_baseline(account, &snapshot, &mut run).await;
        run.advance(CheckState::BaselineResolved);

        if let Some(finding) = compare_name(account, &snapshot, previous.as_ref()) {
            run.push(finding);
        }
        let picture_failed = self
            .compare_picture(account, &snapshot, previous.as_ref(), &mut run)
            .await;
        run.advance(CheckState::Compared);

        if run.findings.is_empty() {
            run.push(Finding::new(
                FindingKind::Unchanged,
                Severity::Ok,
                "No changes",
            ));
        }
        run.advance(CheckState::Reported);

        if let Some(previous) = &previous {
            if let Some(updated) = updated_record(previous, &snapshot, picture_failed) {
                match self.baselines.save(&account.name, &updated).await {
                    Ok(()) => run.baseline_written = true,
                    Err(e) => run.push(Finding::from_error(
                        FindingKind::PersistFailed,
                        "Could not save baseline",
                        &e,
                    )),
                }
            }
        }
        run.advance(CheckState::Done);

        run.finish(Some(snapshot))
    }

    /// Load the previous baseline. When there is none (or it is unreadable)
    /// the snapshot is saved as the new baseline and `None` is returned, so
    /// nothing is compared against previous state this cycle.
    async fn resolve_baseline(
        &self,
        account: &Account,
        snapshot: &ProfileSnapshot,
        run: &mut CheckRun,
    ) -> Option<BaselineRecord> {
        match self.baselines.load(&account.name).await {
            Ok(Some(record)) => return Some(record),
            Ok(None) => {}
            Err(e) => run.push(Finding::from_error(
                FindingKind::BaselineCorrupt,
                "Stored baseline unreadable, starting fresh",
                &e,
            )),
        }

        let record = BaselineRecord::from_snapshot(snapshot);
        match self.baselines.save(&account.name, &record).await {
            Ok(()) => {
                run.baseline_written = true;
                run.push(Finding::new(
                    FindingKind::BaselineAutoSaved,
                    Severity::Info,
                    "Baseline auto-saved",
                ));
            }
            Err(e) => run.push(Finding::from_error(
                FindingKind::PersistFailed,
                "Could not save baseline",
                &e,
            )),
        }
        None
    }

    /// Appends at most one picture finding. Returns true if the comparison
    /// itself failed.
    async fn compare_picture(
        &self,
        account: &Account,
        snapshot: &ProfileSnapshot,
        previous: Option<&BaselineRecord>,
        run: &mut CheckRun,
    ) -> bool {
        let (reference, source) = match (&account.expected_picture_url, previous) {
            (Some(expected), _) => (Some(expected.as_str()), Reference::Expected),
            (None, Some(previous)) => (previous.picture_url.as_deref(), Reference::Previous),
            (None, None) => return false,
        };
        let current = snapshot.picture_url.as_deref();

        let (reference_url, current_url) = match (reference, current) {
            (None, None) => return false,
            (Some(r), Some(c)) if r == c => return false,
            (None, Some(c)) => {
                run.push(Finding::new(
                    FindingKind::PictureAdded,
                    Severity::Changed,
                    format!("Picture added: {}", c),
                ));
                return false;
            }
            (Some(_), None) => {
                run.push(Finding::new(
                    FindingKind::PictureRemoved,
                    Severity::Changed,
                    "Picture removed",
                ));
                return false;
            }
            (Some(r), Some(c)) => (r, c),
        };

        match self
            .comparator
            .compare(self.images.as_ref(), reference_url, current_url)
            .await
        {
            Ok(result) => {
                let detail = match result.similarity {
                    Some(similarity) => format!("similarity {:.2}%", similarity),
                    None if result.matched => "identical content".to_string(),
                    None => "content differs".to_string(),
                };
                let finding = if result.matched {
                    Finding::new(
                        FindingKind::PictureMatches,
                        Severity::Ok,
                        format!("Picture matches ({})", detail),
                    )
                } else {
                    let label = match source {
                        Reference::Expected => "Picture differs from expected",
                        Reference::Previous => "Picture changed",
                    };
                    Finding::new(
                        FindingKind::PictureChanged,
                        Severity::Changed,
                        format!("{} ({})", label, detail),
                    )
                };
                run.push(finding);
                false
            }
            Err(e) => {
                run.push(Finding::from_error(
                    FindingKind::ComparisonFailed,
                    "Picture comparison failed",
                    &e,
                ));
                true
            }
        }
    }
}

fn compare_name(
    account: &Account,
    snapshot: &ProfileSnapshot,
    previous: Option<&BaselineRecord>,
) -> Option<Finding> {
    let (reference, source) = match (&account.expected_name, previous) {
        (Some(expected), _) => (expected.as_str(), Reference::Expected),
        (None, Some(previous)) => (previous.display_name.as_deref()?, Reference::Previous),
        (None, None) => return None,
    };
    if reference == snapshot.display_name {
        return None;
    }

    let message = match source {
        Reference::Expected => format!(
            "Name differs from expected: expected \"{}\", got \"{}\"",
            reference, snapshot.display_name
        ),
        Reference::Previous => format!(
            "Name changed: \"{}\" -> \"{}\"",
            reference, snapshot.display_name
        ),
    };
    Some(Finding::new(FindingKind::NameChanged, Severity::Changed, message))
}

/// The record to persist after a cycle, or `None` if nothing changed. A
/// picture whose comparison failed keeps its previous value.
fn updated_record(
    previous: &BaselineRecord,
    snapshot: &ProfileSnapshot,
    picture_failed: bool,
) -> Option<BaselineRecord> {
    let name_changed = previous.display_name.as_deref() != Some(snapshot.display_name.as_str());
    let picture_changed = previous.picture_url != snapshot.picture_url && !picture_failed;
    if !name_changed && !picture_changed {
        return None;
    }

    let mut updated = BaselineRecord::from_snapshot(snapshot);
    if !picture_changed {
        updated.picture_url = previous.picture_url.clone();
    }
    Some(updated)
}
