//! Invocation requests and the responses returned for them.

use serde::{Deserialize, Serialize};

use super::activity::ActivityResult;

/// The input event of one invocation.
///
/// With both flags unset the invocation runs a full scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanRequest {
    /// Ping every external collaborator instead of scanning.
    pub test_connection: bool,
    /// Report the job count and current block instead of scanning.
    pub status: bool,
}

/// The steps of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// Not started.
    Idle,
    /// Enumerating job addresses from the Sequencer.
    ResolvingJobs,
    /// Running the activity analysis.
    AnalyzingActivity,
    /// Applying the alert policy and delivering its alert.
    Notifying,
    /// Pushing execution metrics.
    PublishingMetrics,
    /// Finished successfully.
    Done,
    /// Aborted by an error.
    Failed,
}

/// The result of a full scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// `true` when the scan reached `Done`.
    pub success: bool,
    /// The terminal phase, `Done` or `Failed`.
    pub phase: ScanPhase,
    /// The phase that was running when the scan failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<ScanPhase>,
    /// Number of jobs resolved from the Sequencer.
    pub jobs_monitored: usize,
    /// The activity analysis, when it ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityResult>,
    /// Stale jobs found by the stale-job policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_jobs: Option<usize>,
    /// Alerts delivered during the scan.
    pub alerts_sent: u64,
    /// Wall-clock duration of the scan in milliseconds.
    pub duration_ms: u64,
    /// The error that failed the scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The outcome of one connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityCheck {
    /// The probed collaborator (`rpc`, `sequencer`, `notifier`, `metrics`).
    pub name: String,
    /// Whether the probe succeeded.
    pub ok: bool,
    /// Probe result or error message.
    pub detail: String,
}

/// Job count and chain head, returned by a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Number of jobs registered in the Sequencer.
    pub job_count: u64,
    /// Current block number.
    pub current_block: u64,
}

/// The response to one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanResponse {
    /// A full scan ran.
    Scan(ScanReport),
    /// Connectivity probes ran.
    ConnectivityTest {
        /// `true` when every probe succeeded.
        success: bool,
        /// Per-collaborator results.
        checks: Vec<ConnectivityCheck>,
    },
    /// A status query ran.
    Status {
        /// `true` when the status could be read.
        success: bool,
        /// The status, when it could be read.
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<StatusReport>,
        /// The error, when it could not.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ScanResponse {
    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        match self {
            ScanResponse::Scan(report) => report.success,
            ScanResponse::ConnectivityTest { success, .. } | ScanResponse::Status { success, .. } => {
                *success
            }
        }
    }
}
