//! The activity analyzer answers whether any monitored job executed `work`
//! in the last N blocks, picking the cheapest strategy for the window size.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    models::{
        ActivityResult, AnalysisMethod, BlockActivity, BlockWindow, JobAddress,
        LOGS_MAX_BLOCK_RANGE,
    },
    providers::{ChainSource, RpcError},
};

/// Upper bound on the verification calls attributed to one logs query.
const VERIFICATION_COST_CAP: u64 = 50;

/// Errors that can occur during an analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// A window of zero blocks was requested.
    #[error("Block window must hold at least one block")]
    EmptyWindow,

    /// The analysis was cancelled.
    #[error("Analysis cancelled")]
    Cancelled,

    /// The chain could not be read.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The primary strategy failed and so did the block-range fallback.
    #[error("{method} analysis failed ({primary}); block-range fallback failed: {fallback}")]
    FallbackFailed {
        /// The strategy that failed first.
        method: AnalysisMethod,
        /// Its error.
        primary: RpcError,
        /// The fallback's error.
        fallback: RpcError,
    },
}

/// Blocks found by one strategy run and the calls it issued, excluding the
/// latest-block lookup.
struct StrategyOutcome {
    blocks: Vec<BlockActivity>,
    rpc_calls: u64,
}

/// Runs activity analyses against a chain source.
pub struct ActivityAnalyzer<C: ?Sized> {
    chain: Arc<C>,
    chunk_delay: Duration,
    cancellation: CancellationToken,
}

impl<C: ChainSource + ?Sized> ActivityAnalyzer<C> {
    /// Creates an analyzer that pauses `chunk_delay` between chunks and stops
    /// when `cancellation` fires.
    pub fn new(chain: Arc<C>, chunk_delay: Duration, cancellation: CancellationToken) -> Self {
        Self { chain, chunk_delay, cancellation }
    }

    /// Analyzes the last `window_size` blocks for work executed by `jobs`.
    ///
    /// The chain head is read once; every strategy works on the window it
    /// defines. When the selected strategy fails, the whole window is
    /// analyzed once more with the block-range strategy.
    #[tracing::instrument(skip(self, jobs), fields(job_count = jobs.len()), level = "debug")]
    pub async fn analyze(
        &self,
        jobs: &[JobAddress],
        window_size: u64,
    ) -> Result<ActivityResult, AnalyzerError> {
        if window_size == 0 {
            return Err(AnalyzerError::EmptyWindow);
        }

        let latest_block = self.chain.get_latest_block_number().await?;
        let window = BlockWindow::ending_at(latest_block, window_size);
        let method = AnalysisMethod::for_window(window_size);
        let monitored: Vec<JobAddress> =
            jobs.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

        tracing::info!(
            %method,
            start_block = window.start_block,
            end_block = window.end_block,
            "Analyzing job activity."
        );

        let primary = match method {
            AnalysisMethod::Logs => self.logs_strategy(&monitored, window).await,
            AnalysisMethod::BlockRange => self.block_range_strategy(&monitored, window).await,
            AnalysisMethod::Chunked => self.chunked_strategy(&monitored, window).await,
        };

        let (outcome, used, fallback_from) = match primary {
            Ok(outcome) => (outcome, method, None),
            Err(AnalyzerError::Rpc(primary)) => {
                if self.cancellation.is_cancelled() {
                    return Err(AnalyzerError::Cancelled);
                }
                tracing::warn!(
                    %method,
                    error = %primary,
                    "Strategy failed, falling back to block range over the full window."
                );
                let outcome = self
                    .block_range_strategy(&monitored, window)
                    .await
                    .map_err(|e| match e {
                        AnalyzerError::Rpc(fallback) => {
                            AnalyzerError::FallbackFailed { method, primary, fallback }
                        }
                        other => other,
                    })?;
                (outcome, AnalysisMethod::BlockRange, Some(method))
            }
            Err(e) => return Err(e),
        };

        let result = ActivityResult {
            total_work_transactions: count_work(&outcome.blocks),
            last_analyzed_block: latest_block,
            rpc_calls_count: 1 + outcome.rpc_calls,
            method: used,
            window,
            blocks: outcome.blocks,
            fallback_from,
        };
        tracing::info!(
            method = %result.method,
            work_transactions = result.total_work_transactions,
            rpc_calls = result.rpc_calls_count,
            "Activity analysis complete."
        );
        Ok(result)
    }

    /// One `eth_getLogs` query plus verification of each candidate.
    async fn logs_strategy(
        &self,
        jobs: &[JobAddress],
        window: BlockWindow,
    ) -> Result<StrategyOutcome, AnalyzerError> {
        let blocks = self
            .chain
            .get_work_transactions_by_logs(jobs, window.start_block, window.end_block)
            .await?;
        let verification = (2 * blocks.len() as u64).min(VERIFICATION_COST_CAP);
        Ok(StrategyOutcome { blocks, rpc_calls: 1 + verification })
    }

    /// One batched block fetch over the window, restricted to `jobs`.
    async fn block_range_strategy(
        &self,
        jobs: &[JobAddress],
        window: BlockWindow,
    ) -> Result<StrategyOutcome, AnalyzerError> {
        let monitored: BTreeSet<JobAddress> = jobs.iter().copied().collect();
        let mut blocks =
            self.chain.get_block_range(window.start_block, window.end_block).await?;
        for block in &mut blocks {
            block.retain_jobs(&monitored);
        }
        blocks.retain(|block| !block.worked_job_addresses.is_empty());
        Ok(StrategyOutcome { blocks, rpc_calls: 1 })
    }

    /// The logs strategy over consecutive chunks, pausing between them.
    async fn chunked_strategy(
        &self,
        jobs: &[JobAddress],
        window: BlockWindow,
    ) -> Result<StrategyOutcome, AnalyzerError> {
        let chunks = window.chunks(LOGS_MAX_BLOCK_RANGE);
        let mut total = StrategyOutcome { blocks: Vec::new(), rpc_calls: 0 };

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                self.pause().await?;
            } else if self.cancellation.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }

            let outcome = self.logs_strategy(jobs, *chunk).await?;
            tracing::debug!(
                chunk = i + 1,
                chunks = chunks.len(),
                start_block = chunk.start_block,
                end_block = chunk.end_block,
                worked_blocks = outcome.blocks.len(),
                "Analyzed chunk."
            );
            total.rpc_calls += outcome.rpc_calls;
            total.blocks.extend(outcome.blocks);
        }
        Ok(total)
    }

    async fn pause(&self) -> Result<(), AnalyzerError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(AnalyzerError::Cancelled),
            _ = tokio::time::sleep(self.chunk_delay) => Ok(()),
        }
    }
}

fn count_work(blocks: &[BlockActivity]) -> u64 {
    blocks.iter().map(|block| block.worked_job_addresses.len() as u64).sum()
}
