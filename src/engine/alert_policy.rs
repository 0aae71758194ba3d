//! Alert policies decide, from an activity analysis, what to tell the
//! operators.

use std::{collections::HashMap, sync::Arc};

use alloy::primitives::B256;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use super::job_directory::{DirectoryError, JobDirectory};
use crate::{
    config::AlertPolicyKind,
    models::{ActivityResult, Alert, AlertField, JobAddress, JobStatus, Severity},
    providers::ChainSource,
};

/// Errors that can occur while evaluating a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Job workability could not be read.
    #[error("Failed to check job workability: {0}")]
    Directory(#[from] DirectoryError),
}

/// The decision of a policy for one scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOutcome {
    /// The alert to deliver, if any.
    pub alert: Option<Alert>,
    /// Number of stale jobs, for policies that classify jobs.
    pub stale_jobs: Option<usize>,
    /// Per-job classification, for policies that classify jobs.
    pub job_statuses: Vec<JobStatus>,
}

/// A rule that turns an activity analysis into an optional alert.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertPolicy: Send + Sync {
    /// The configuration name of the policy.
    fn kind(&self) -> AlertPolicyKind;

    /// Evaluates the policy for the monitored `jobs`.
    async fn evaluate(
        &self,
        jobs: &[JobAddress],
        activity: &ActivityResult,
    ) -> Result<PolicyOutcome, PolicyError>;
}

/// Raises a high-severity alert when no job worked in the window.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActivityAlertPolicy;

#[async_trait]
impl AlertPolicy for ActivityAlertPolicy {
    fn kind(&self) -> AlertPolicyKind {
        AlertPolicyKind::Activity
    }

    async fn evaluate(
        &self,
        jobs: &[JobAddress],
        activity: &ActivityResult,
    ) -> Result<PolicyOutcome, PolicyError> {
        if activity.total_work_transactions > 0 {
            tracing::debug!(
                work_transactions = activity.total_work_transactions,
                "Jobs are active, no alert."
            );
            return Ok(PolicyOutcome::default());
        }

        let window = activity.window;
        let alert = Alert::new(
            "No Sequencer job activity",
            format!(
                "None of the {} monitored jobs executed work in the last {} blocks.",
                jobs.len(),
                window.len()
            ),
            Severity::High,
        )
        .with_field(AlertField::inline("Jobs monitored", jobs.len()))
        .with_field(AlertField::inline(
            "Blocks",
            format!("{} - {}", window.start_block, window.end_block),
        ))
        .with_field(AlertField::inline("Method", activity.method))
        .with_field(AlertField::inline("RPC calls", activity.rpc_calls_count));

        Ok(PolicyOutcome { alert: Some(alert), ..Default::default() })
    }
}

/// Classifies every job as stale or active and always sends a summary.
pub struct StaleJobAlertPolicy<C: ?Sized> {
    directory: Arc<JobDirectory<C>>,
    network: B256,
}

impl<C: ChainSource + ?Sized> StaleJobAlertPolicy<C> {
    /// Creates the policy; workability is checked against `network`.
    pub fn new(directory: Arc<JobDirectory<C>>, network: B256) -> Self {
        Self { directory, network }
    }
}

fn address_list(statuses: &[&JobStatus]) -> String {
    if statuses.is_empty() {
        return "none".to_string();
    }
    statuses.iter().map(|status| status.address.to_string()).collect::<Vec<_>>().join("\n")
}

#[async_trait]
impl<C: ChainSource + ?Sized + 'static> AlertPolicy for StaleJobAlertPolicy<C> {
    fn kind(&self) -> AlertPolicyKind {
        AlertPolicyKind::StaleJobs
    }

    async fn evaluate(
        &self,
        jobs: &[JobAddress],
        activity: &ActivityResult,
    ) -> Result<PolicyOutcome, PolicyError> {
        let workable: HashMap<JobAddress, bool> = self
            .directory
            .check_jobs_workability(jobs, self.network)
            .await?
            .into_iter()
            .map(|status| (status.address, status.workable))
            .collect();

        let statuses: Vec<JobStatus> = jobs
            .iter()
            .map(|job| {
                JobStatus::new(
                    *job,
                    workable.get(job).copied().unwrap_or(false),
                    activity.last_worked_block(job),
                )
            })
            .collect();

        let stale: Vec<&JobStatus> = statuses.iter().filter(|s| s.is_stale).collect();
        let (stale_workable, stale_idle): (Vec<&JobStatus>, Vec<&JobStatus>) =
            stale.iter().copied().partition(|s| s.workable);
        let active: Vec<&JobStatus> = statuses.iter().filter(|s| !s.is_stale).collect();

        let severity = if !stale_workable.is_empty() {
            Severity::High
        } else if !stale.is_empty() {
            Severity::Medium
        } else {
            Severity::Info
        };

        let window = activity.window;
        let alert = Alert::new(
            "Sequencer job status",
            format!(
                "{} of {} jobs did not work in blocks {} - {}; {} of them are workable.",
                stale.len(),
                statuses.len(),
                window.start_block,
                window.end_block,
                stale_workable.len()
            ),
            severity,
        )
        .with_field(AlertField::inline("Jobs monitored", statuses.len()))
        .with_field(AlertField::inline("Stale", stale.len()))
        .with_field(AlertField::inline("Work transactions", activity.total_work_transactions))
        .with_field(AlertField::block("Stale and workable", address_list(&stale_workable)))
        .with_field(AlertField::block("Stale", address_list(&stale_idle)))
        .with_field(AlertField::block("Active", address_list(&active)));

        tracing::info!(
            stale = stale.len(),
            stale_workable = stale_workable.len(),
            severity = ?severity,
            "Classified jobs."
        );

        Ok(PolicyOutcome {
            alert: Some(alert),
            stale_jobs: Some(stale.len()),
            job_statuses: statuses,
        })
    }
}

/// Builds the policy selected by `kind`.
pub fn create_alert_policy<C>(
    kind: AlertPolicyKind,
    directory: Arc<JobDirectory<C>>,
    network: B256,
) -> Arc<dyn AlertPolicy>
where
    C: ChainSource + ?Sized + 'static,
{
    match kind {
        AlertPolicyKind::Activity => Arc::new(ActivityAlertPolicy),
        AlertPolicyKind::StaleJobs => Arc::new(StaleJobAlertPolicy::new(directory, network)),
    }
}
