//! The RPC Gateway: JSON-RPC access to an Ethereum-compatible node.

pub mod error;
pub mod rpc;
pub mod traits;
pub mod wire;

pub use error::RpcError;
pub use rpc::RpcGateway;
pub use traits::{ChainSource, RpcStats};
pub use wire::{JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse};
