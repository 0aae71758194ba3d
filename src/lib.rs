#![warn(missing_docs)]
//! Sequencer Monitor watches the jobs registered in a keeper Sequencer contract
//! and raises an alert when none of them has executed `work` recently.

pub mod cmd;
pub mod config;
pub mod context;
pub mod contracts;
pub mod engine;
pub mod http_client;
pub mod metrics;
pub mod models;
pub mod notification;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;
