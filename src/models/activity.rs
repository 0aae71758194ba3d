//! Block windows and the results of work-activity analysis.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::job::JobAddress;

/// The largest block range a single `eth_getLogs` call may cover.
pub const LOGS_MAX_BLOCK_RANGE: u64 = 500;

/// The largest window analyzed with a single batched block-range call.
pub const BLOCK_RANGE_MAX_WINDOW: u64 = 1000;

/// An inclusive range of block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockWindow {
    /// First block of the window.
    pub start_block: u64,
    /// Last block of the window.
    pub end_block: u64,
}

impl BlockWindow {
    /// Creates a window, returning `None` when `end_block < start_block`.
    pub fn new(start_block: u64, end_block: u64) -> Option<Self> {
        (end_block >= start_block).then_some(Self { start_block, end_block })
    }

    /// The window of the last `size` blocks ending at `latest_block`.
    ///
    /// Near genesis the window is clamped at block 0 and may be shorter than
    /// `size`.
    pub fn ending_at(latest_block: u64, size: u64) -> Self {
        let start_block = latest_block.saturating_sub(size.saturating_sub(1));
        Self { start_block, end_block: latest_block }
    }

    /// Number of blocks in the window.
    pub fn len(&self) -> u64 {
        self.end_block - self.start_block + 1
    }

    /// A window always holds at least one block.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Splits the window into consecutive sub-windows of at most `chunk_size`
    /// blocks.
    pub fn chunks(&self, chunk_size: u64) -> Vec<BlockWindow> {
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut start = self.start_block;
        loop {
            let end = start.saturating_add(chunk_size - 1).min(self.end_block);
            chunks.push(BlockWindow { start_block: start, end_block: end });
            if end == self.end_block {
                break;
            }
            start = end + 1;
        }
        chunks
    }
}

/// The jobs whose work method was invoked in one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockActivity {
    /// The block number.
    pub block_number: u64,
    /// Distinct job addresses that received a work call in this block.
    pub worked_job_addresses: BTreeSet<JobAddress>,
    /// Block timestamp in seconds, when the source provided one.
    pub timestamp: Option<u64>,
}

impl BlockActivity {
    /// Creates an activity record with no worked jobs.
    pub fn new(block_number: u64, timestamp: Option<u64>) -> Self {
        Self { block_number, worked_job_addresses: BTreeSet::new(), timestamp }
    }

    /// Drops every address not in `jobs`.
    pub fn retain_jobs(&mut self, jobs: &BTreeSet<JobAddress>) {
        self.worked_job_addresses.retain(|address| jobs.contains(address));
    }
}

/// The strategy used to analyze a block window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisMethod {
    /// One `eth_getLogs` call plus per-transaction verification.
    Logs,
    /// One batched `eth_getBlockByNumber` round trip over the whole window.
    BlockRange,
    /// The logs strategy applied to consecutive chunks of the window.
    Chunked,
}

impl AnalysisMethod {
    /// Selects the strategy for a window of `window_size` blocks.
    pub fn for_window(window_size: u64) -> Self {
        if window_size <= LOGS_MAX_BLOCK_RANGE {
            AnalysisMethod::Logs
        } else if window_size <= BLOCK_RANGE_MAX_WINDOW {
            AnalysisMethod::BlockRange
        } else {
            AnalysisMethod::Chunked
        }
    }

    /// The wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::Logs => "LOGS",
            AnalysisMethod::BlockRange => "BLOCK_RANGE",
            AnalysisMethod::Chunked => "CHUNKED",
        }
    }
}

impl std::fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one activity analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResult {
    /// Work executions found, counted once per (block, job) pair.
    pub total_work_transactions: u64,
    /// The latest block number fixed at the start of the analysis.
    pub last_analyzed_block: u64,
    /// Remote calls consumed by the analysis.
    pub rpc_calls_count: u64,
    /// The strategy that produced this result.
    pub method: AnalysisMethod,
    /// The analyzed window.
    pub window: BlockWindow,
    /// Blocks with at least one work execution, ascending.
    pub blocks: Vec<BlockActivity>,
    /// Set when the primary strategy failed and this result came from the
    /// block-range fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<AnalysisMethod>,
}

impl ActivityResult {
    /// The highest block in which `job` executed work, if any.
    pub fn last_worked_block(&self, job: &JobAddress) -> Option<u64> {
        self.blocks
            .iter()
            .rev()
            .find(|block| block.worked_job_addresses.contains(job))
            .map(|block| block.block_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_selection_boundaries() {
        assert_eq!(AnalysisMethod::for_window(1), AnalysisMethod::Logs);
        assert_eq!(AnalysisMethod::for_window(500), AnalysisMethod::Logs);
        assert_eq!(AnalysisMethod::for_window(501), AnalysisMethod::BlockRange);
        assert_eq!(AnalysisMethod::for_window(1000), AnalysisMethod::BlockRange);
        assert_eq!(AnalysisMethod::for_window(1001), AnalysisMethod::Chunked);
    }

    #[test]
    fn test_method_serializes_as_wire_name() {
        assert_eq!(serde_json::to_string(&AnalysisMethod::BlockRange).unwrap(), "\"BLOCK_RANGE\"");
        assert_eq!(AnalysisMethod::Chunked.to_string(), "CHUNKED");
    }

    #[test]
    fn test_window_ending_at() {
        let window = BlockWindow::ending_at(1000, 10);
        assert_eq!(window, BlockWindow { start_block: 991, end_block: 1000 });
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn test_window_clamped_at_genesis() {
        let window = BlockWindow::ending_at(3, 10);
        assert_eq!(window.start_block, 0);
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        assert!(BlockWindow::new(10, 9).is_none());
        assert_eq!(BlockWindow::new(9, 9).map(|w| w.len()), Some(1));
    }

    #[test]
    fn test_window_chunks() {
        let window = BlockWindow::new(1, 1200).unwrap();
        let chunks = window.chunks(500);
        assert_eq!(
            chunks,
            vec![
                BlockWindow { start_block: 1, end_block: 500 },
                BlockWindow { start_block: 501, end_block: 1000 },
                BlockWindow { start_block: 1001, end_block: 1200 },
            ]
        );
        assert_eq!(chunks.iter().map(BlockWindow::len).sum::<u64>(), window.len());
    }

    #[test]
    fn test_last_worked_block() {
        let job = JobAddress::default();
        let mut early = BlockActivity::new(5, None);
        early.worked_job_addresses.insert(job);
        let mut late = BlockActivity::new(8, None);
        late.worked_job_addresses.insert(job);
        let result = ActivityResult {
            total_work_transactions: 2,
            last_analyzed_block: 10,
            rpc_calls_count: 4,
            method: AnalysisMethod::Logs,
            window: BlockWindow::ending_at(10, 10),
            blocks: vec![early, late],
            fallback_from: None,
        };
        assert_eq!(result.last_worked_block(&job), Some(8));
        assert_eq!(result.last_worked_block(&"0x0000000000000000000000000000000000000001".parse().unwrap()), None);
    }
}
