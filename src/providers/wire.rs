//! JSON-RPC 2.0 envelopes and the subset of node objects the monitor reads.

use alloy::primitives::{Address, B256, Bytes};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use super::RpcError;

/// Protocol version sent in every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC code used when a batch response lacks an entry for a request.
pub const MISSING_RESPONSE_CODE: i64 = -32603;

/// Encodes a number as a `0x`-prefixed hex quantity.
pub fn to_hex_quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Decodes a `0x`-prefixed hex quantity.
pub fn parse_hex_quantity(s: &str) -> Result<u64, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| format!("hex quantity '{s}' is missing the 0x prefix"))?;
    if digits.is_empty() {
        return Err(format!("hex quantity '{s}' has no digits"));
    }
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex quantity '{s}': {e}"))
}

/// Params of an `eth_call` against the latest block.
pub fn eth_call_params(to: Address, data: &Bytes) -> Value {
    json!([{ "to": to, "data": data }, "latest"])
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_hex_quantity(&s).map_err(serde::de::Error::custom)
}

fn deserialize_optional_quantity<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| parse_hex_quantity(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// A JSON-RPC request object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The method name.
    pub method: String,
    /// Positional parameters.
    pub params: Value,
    /// Correlates the response with this request.
    pub id: u64,
}

impl JsonRpcRequest {
    /// Creates a request.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), method: method.into(), params, id }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Optional extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC response object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// The id of the request this answers. `null` when the node could not
    /// parse the request.
    #[serde(default)]
    pub id: Option<u64>,
    /// The result, absent on error. A JSON `null` result also reads as `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error, absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    /// A successful response.
    pub fn success(id: u64, result: Value) -> Self {
        Self { id: Some(id), result: Some(result), error: None }
    }

    /// A failed response.
    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            result: None,
            error: Some(JsonRpcErrorObject { code, message: message.into(), data: None }),
        }
    }

    /// The placeholder returned for a request the node did not answer.
    pub(crate) fn missing(id: u64) -> Self {
        Self::failure(id, MISSING_RESPONSE_CODE, "missing response")
    }

    /// Returns the result value, or the error object as `RpcError::Protocol`.
    pub fn into_result(self, operation: &'static str) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => {
                Err(RpcError::Protocol { operation, code: error.code, message: error.message })
            }
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }

    /// Deserializes the result into `T`.
    pub fn decode<T: DeserializeOwned>(self, operation: &'static str) -> Result<T, RpcError> {
        let value = self.into_result(operation)?;
        serde_json::from_value(value).map_err(|e| RpcError::decode(operation, e))
    }
}

/// An HTTP response body: a batch array or a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ResponseBody {
    Batch(Vec<JsonRpcResponse>),
    Single(JsonRpcResponse),
}

impl ResponseBody {
    pub(crate) fn into_vec(self) -> Vec<JsonRpcResponse> {
        match self {
            ResponseBody::Batch(responses) => responses,
            ResponseBody::Single(response) => vec![response],
        }
    }
}

/// A block returned by `eth_getBlockByNumber(number, true)`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcBlock {
    /// Block number.
    #[serde(deserialize_with = "deserialize_quantity")]
    pub number: u64,
    /// Block timestamp in seconds.
    #[serde(deserialize_with = "deserialize_quantity")]
    pub timestamp: u64,
    /// Full transaction objects.
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

/// A transaction object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Recipient; `None` for contract creation.
    #[serde(default)]
    pub to: Option<Address>,
    /// Call data.
    #[serde(default, alias = "data")]
    pub input: Bytes,
    /// Including block; `None` while pending.
    #[serde(default, deserialize_with = "deserialize_optional_quantity")]
    pub block_number: Option<u64>,
}

/// A log entry returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    /// Emitting contract.
    pub address: Address,
    /// Transaction that emitted the log.
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    /// Including block.
    #[serde(default, deserialize_with = "deserialize_optional_quantity")]
    pub block_number: Option<u64>,
    /// Including block's timestamp, on nodes that report it.
    #[serde(default, deserialize_with = "deserialize_optional_quantity")]
    pub block_timestamp: Option<u64>,
}
