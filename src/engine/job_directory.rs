//! Enumerates the jobs registered in the Sequencer and checks whether they
//! can currently be worked.

use std::{collections::HashSet, sync::Arc};

use alloy::{
    primitives::{Address, B256, Bytes, U256},
    sol_types::SolCall,
};
use thiserror::Error;

use crate::{
    contracts::{IJob, ISequencer},
    models::{JobAddress, WorkableStatus},
    providers::{ChainSource, JsonRpcRequest, RpcError, wire::eth_call_params},
};

/// Errors that can occur while reading the Sequencer.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The RPC gateway failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// A contract call returned data that does not match its ABI.
    #[error("Failed to decode {call} result: {message}")]
    Decode {
        /// The contract function.
        call: &'static str,
        /// What could not be decoded.
        message: String,
    },
}

/// Reads job addresses and workability from the chain.
pub struct JobDirectory<C: ?Sized> {
    chain: Arc<C>,
}

impl<C: ChainSource + ?Sized> JobDirectory<C> {
    /// Creates a resolver backed by `chain`.
    pub fn new(chain: Arc<C>) -> Self {
        Self { chain }
    }

    /// Number of jobs registered in the Sequencer.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn num_jobs(&self, sequencer: Address) -> Result<u64, DirectoryError> {
        let data = self
            .chain
            .eth_call(sequencer, Bytes::from(ISequencer::numJobsCall {}.abi_encode()))
            .await?;
        let count = ISequencer::numJobsCall::abi_decode_returns(&data)
            .map_err(|e| DirectoryError::Decode { call: "numJobs", message: e.to_string() })?;
        u64::try_from(count).map_err(|_| DirectoryError::Decode {
            call: "numJobs",
            message: format!("job count {count} out of range"),
        })
    }

    /// Resolves every job address registered in `sequencer`.
    ///
    /// `jobAt` lookups are sent as one batch. Lookups that fail are logged
    /// and skipped, so the result may hold fewer addresses than `numJobs`.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_job_addresses(
        &self,
        sequencer: Address,
    ) -> Result<Vec<JobAddress>, DirectoryError> {
        let count = self.num_jobs(sequencer).await?;
        if count == 0 {
            tracing::info!(%sequencer, "Sequencer has no registered jobs.");
            return Ok(Vec::new());
        }

        let requests = (0..count)
            .map(|index| {
                let call = ISequencer::jobAtCall { index: U256::from(index) };
                let params = eth_call_params(sequencer, &Bytes::from(call.abi_encode()));
                JsonRpcRequest::new(index, "eth_call", params)
            })
            .collect();
        let responses = self.chain.batch_call("jobAt", requests).await?;

        let mut seen = HashSet::new();
        let mut jobs = Vec::with_capacity(responses.len());
        for (index, response) in responses.into_iter().enumerate() {
            let address = response.decode::<Bytes>("jobAt").and_then(|data| {
                ISequencer::jobAtCall::abi_decode_returns(&data)
                    .map_err(|e| RpcError::Decode { operation: "jobAt", message: e.to_string() })
            });
            match address {
                Ok(address) if seen.insert(address) => jobs.push(JobAddress::from(address)),
                Ok(address) => tracing::debug!(index, %address, "Skipping duplicate job."),
                Err(e) => tracing::warn!(index, error = %e, "Skipping job that could not be resolved."),
            }
        }

        tracing::info!(expected = count, resolved = jobs.len(), "Resolved job addresses.");
        Ok(jobs)
    }

    /// Checks `workable(network)` on every job in one batch.
    ///
    /// Returns one entry per input address, in input order. An entry whose
    /// call failed or returned undecodable data reads as not workable.
    #[tracing::instrument(skip(self, addresses), fields(job_count = addresses.len()), level = "debug")]
    pub async fn check_jobs_workability(
        &self,
        addresses: &[JobAddress],
        network: B256,
    ) -> Result<Vec<WorkableStatus>, DirectoryError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let calldata = Bytes::from(IJob::workableCall { network }.abi_encode());
        let requests = addresses
            .iter()
            .enumerate()
            .map(|(i, job)| {
                JsonRpcRequest::new(i as u64, "eth_call", eth_call_params(job.address(), &calldata))
            })
            .collect();
        let responses = self.chain.batch_call("workable", requests).await?;

        let statuses = addresses
            .iter()
            .zip(responses)
            .map(|(address, response)| {
                let workable = response
                    .decode::<Bytes>("workable")
                    .map_err(|e| e.to_string())
                    .and_then(|data| {
                        IJob::workableCall::abi_decode_returns(&data).map_err(|e| e.to_string())
                    });
                match workable {
                    Ok(ret) => WorkableStatus { address: *address, workable: ret.canWork },
                    Err(error) => {
                        tracing::warn!(job = %address, %error, "Workability check failed.");
                        WorkableStatus { address: *address, workable: false }
                    }
                }
            })
            .collect();
        Ok(statuses)
    }
}
