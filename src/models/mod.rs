//! This module contains the data models shared across the monitor.

pub mod activity;
pub mod alert;
pub mod job;
pub mod scan;

pub use activity::{
    ActivityResult, AnalysisMethod, BLOCK_RANGE_MAX_WINDOW, BlockActivity, BlockWindow,
    LOGS_MAX_BLOCK_RANGE,
};
pub use alert::{Alert, AlertField, Severity};
pub use job::{JobAddress, JobStatus, WorkableStatus};
pub use scan::{ConnectivityCheck, ScanPhase, ScanReport, ScanRequest, ScanResponse, StatusReport};
