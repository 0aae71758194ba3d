use alloy::primitives::{Address, B256};
use serde_json::{Value, json};

use crate::{contracts::WORK_SELECTOR, models::JobAddress, providers::wire::to_hex_quantity};

/// A job address made of one repeated byte.
pub fn job(byte: u8) -> JobAddress {
    JobAddress::from(Address::repeat_byte(byte))
}

/// A transaction hash made of one repeated byte.
pub fn tx_hash(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

/// Call data invoking `work` with empty arguments.
pub fn work_input() -> String {
    format!("0x{}{}", hex::encode(WORK_SELECTOR), "00".repeat(96))
}

/// A successful JSON-RPC response object.
pub fn rpc_result(id: u64, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

/// A failed JSON-RPC response object.
pub fn rpc_error(id: u64, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

/// A log entry as returned by `eth_getLogs`.
pub fn log_json(address: JobAddress, tx: B256, block_number: u64) -> Value {
    json!({
        "address": address.to_string(),
        "topics": [],
        "data": "0x",
        "blockNumber": to_hex_quantity(block_number),
        "transactionHash": tx,
        "logIndex": "0x0",
        "removed": false
    })
}

/// Builds transaction objects as returned by the node.
pub struct TransactionBuilder {
    hash: B256,
    to: Option<Address>,
    input: String,
    block_number: Option<u64>,
}

impl TransactionBuilder {
    /// A transaction with the given hash and empty call data.
    pub fn new(hash: B256) -> Self {
        Self { hash, to: None, input: "0x".to_string(), block_number: None }
    }

    /// Sets the recipient.
    pub fn to(mut self, to: JobAddress) -> Self {
        self.to = Some(to.address());
        self
    }

    /// Sets work call data.
    pub fn work(mut self) -> Self {
        self.input = work_input();
        self
    }

    /// Sets raw call data.
    pub fn input(mut self, input: &str) -> Self {
        self.input = input.to_string();
        self
    }

    /// Sets the including block.
    pub fn block_number(mut self, number: u64) -> Self {
        self.block_number = Some(number);
        self
    }

    /// Builds the JSON object.
    pub fn build(self) -> Value {
        json!({
            "hash": self.hash,
            "to": self.to,
            "from": Address::repeat_byte(0xee),
            "input": self.input,
            "blockNumber": self.block_number.map(to_hex_quantity),
            "value": "0x0",
            "nonce": "0x1"
        })
    }
}

/// Builds block objects as returned by `eth_getBlockByNumber(n, true)`.
pub struct BlockBuilder {
    number: u64,
    timestamp: u64,
    transactions: Vec<Value>,
}

impl BlockBuilder {
    /// A block with the given number and no transactions.
    pub fn new(number: u64) -> Self {
        Self { number, timestamp: 1_700_000_000 + number * 12, transactions: Vec::new() }
    }

    /// Appends a transaction object.
    pub fn transaction(mut self, transaction: Value) -> Self {
        self.transactions.push(transaction);
        self
    }

    /// Builds the JSON object.
    pub fn build(self) -> Value {
        json!({
            "number": to_hex_quantity(self.number),
            "hash": B256::with_last_byte((self.number % 256) as u8),
            "timestamp": to_hex_quantity(self.timestamp),
            "transactions": self.transactions
        })
    }
}
