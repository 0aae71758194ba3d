//! This module defines the interface for reading chain data from an
//! EVM-compatible node.

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use super::{
    error::RpcError,
    wire::{JsonRpcRequest, JsonRpcResponse},
};
use crate::models::{BlockActivity, JobAddress};

/// Counters of outbound traffic for one gateway instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RpcStats {
    /// HTTP requests sent (a batch counts once; retries are not counted).
    pub requests: u64,
    /// Requests or batch items that ended in an error.
    pub failures: u64,
}

impl RpcStats {
    /// The traffic recorded since `earlier` was taken.
    pub fn since(&self, earlier: &RpcStats) -> RpcStats {
        RpcStats {
            requests: self.requests.saturating_sub(earlier.requests),
            failures: self.failures.saturating_sub(earlier.failures),
        }
    }
}

/// A trait for a source of chain data.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Sends several JSON-RPC requests in one HTTP round trip.
    ///
    /// The result is aligned with `requests` by position. Items the node
    /// answered with an error, or did not answer at all, are returned as
    /// error responses instead of failing the whole call.
    async fn batch_call(
        &self,
        operation: &'static str,
        requests: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, RpcError>;

    /// Executes a read-only contract call against the latest block.
    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError>;

    /// Fetches the number of the most recent block.
    async fn get_latest_block_number(&self) -> Result<u64, RpcError>;

    /// Fetches `start..=end` with full transactions and reports, per block,
    /// every recipient of a `work` call. Blocks the node does not return are
    /// omitted.
    async fn get_block_range(&self, start: u64, end: u64)
    -> Result<Vec<BlockActivity>, RpcError>;

    /// Finds verified `work` transactions sent to `addresses` in
    /// `from_block..=to_block` by way of their event logs.
    async fn get_work_transactions_by_logs(
        &self,
        addresses: &[JobAddress],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<BlockActivity>, RpcError>;

    /// A snapshot of the traffic counters.
    fn stats(&self) -> RpcStats;
}
