//! A set of helpers for testing

mod config;
mod rpc;

pub use config::{fast_http_retry, fast_rpc_retry, test_scan_settings};
pub use rpc::{
    BlockBuilder, TransactionBuilder, job, log_json, rpc_error, rpc_result, tx_hash, work_input,
};
