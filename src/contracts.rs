//! Solidity bindings for the Sequencer registry and the job contracts it
//! lists.

use alloy::sol;

sol! {
    /// The on-chain registry of keeper jobs.
    interface ISequencer {
        function numJobs() external view returns (uint256);
        function jobAt(uint256 index) external view returns (address);
    }

    /// A keeper job.
    interface IJob {
        function workable(bytes32 network) external returns (bool canWork, bytes memory args);
        function work(bytes32 network, bytes calldata args) external;
    }
}

/// The 4-byte selector of `work(bytes32,bytes)`, computed from the canonical
/// signature by the `sol!` macro.
pub const WORK_SELECTOR: [u8; 4] = <IJob::workCall as alloy::sol_types::SolCall>::SELECTOR;

/// Returns `true` when the call data starts with the work selector.
pub fn is_work_call(input: &[u8]) -> bool {
    input.len() >= WORK_SELECTOR.len() && input[..WORK_SELECTOR.len()] == WORK_SELECTOR
}
