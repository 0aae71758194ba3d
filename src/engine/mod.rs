//! The monitoring engine: job resolution, activity analysis, alert policies
//! and the scan orchestrator that sequences them.

pub mod activity_analyzer;
pub mod alert_policy;
pub mod job_directory;
pub mod scanner;

pub use activity_analyzer::{ActivityAnalyzer, AnalyzerError};
pub use alert_policy::{
    ActivityAlertPolicy, AlertPolicy, PolicyError, PolicyOutcome, StaleJobAlertPolicy,
    create_alert_policy,
};
pub use job_directory::{DirectoryError, JobDirectory};
pub use scanner::{ScanError, ScanSettings, Scanner};
