//! A JSON-RPC gateway over HTTP with retry, backoff and rate limiting.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
};

use alloy::primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use url::Url;

use super::{
    error::RpcError,
    traits::{ChainSource, RpcStats},
    wire::{
        JsonRpcRequest, JsonRpcResponse, ResponseBody, RpcBlock, RpcLog, RpcTransaction,
        eth_call_params, parse_hex_quantity, to_hex_quantity,
    },
};
use crate::{
    config::{BaseHttpClientConfig, RpcRetryConfig},
    contracts::is_work_call,
    http_client::{RateLimiter, create_retryable_http_client},
    models::{BlockActivity, JobAddress, LOGS_MAX_BLOCK_RANGE},
};

/// A `ChainSource` implementation that talks JSON-RPC to a single node.
pub struct RpcGateway {
    url: Url,
    client: ClientWithMiddleware,
    requests: AtomicU64,
    failures: AtomicU64,
}

impl RpcGateway {
    /// Creates a gateway on top of an already configured client.
    pub fn new(url: Url, client: ClientWithMiddleware) -> Self {
        Self { url, client, requests: AtomicU64::new(0), failures: AtomicU64::new(0) }
    }

    /// Creates a gateway whose client applies `retry` to every request.
    #[tracing::instrument(skip_all, fields(url = %url), level = "debug")]
    pub fn from_config(
        url: Url,
        retry: &RpcRetryConfig,
        base_config: &BaseHttpClientConfig,
    ) -> Result<Self, reqwest::Error> {
        let base_client = base_config.build_client(Some(retry.request_timeout_secs))?;
        let rate_limiter = match retry.min_request_interval() {
            interval if interval.is_zero() => None,
            interval => Some(RateLimiter::new(interval)),
        };
        let client = create_retryable_http_client(&retry.http_retry(), base_client, rate_limiter);
        Ok(Self::new(url, client))
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// POSTs `body` and parses the reply as one or more response objects.
    async fn post<B: Serialize + Sync>(
        &self,
        operation: &'static str,
        body: &B,
    ) -> Result<Vec<JsonRpcResponse>, RpcError> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let response =
            self.client.post(self.url.clone()).json(body).send().await.map_err(|e| {
                self.record_failure();
                RpcError::Transport { operation, message: e.to_string() }
            })?;

        let status = response.status();
        if !status.is_success() {
            self.record_failure();
            return Err(RpcError::Transport { operation, message: format!("HTTP status {status}") });
        }

        let body: ResponseBody = response.json().await.map_err(|e| {
            self.record_failure();
            RpcError::decode(operation, e)
        })?;
        Ok(body.into_vec())
    }

    /// Sends a single request and decodes its result.
    async fn request<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        params: Value,
    ) -> Result<T, RpcError> {
        let mut responses =
            self.batch_call(operation, vec![JsonRpcRequest::new(0, operation, params)]).await?;
        responses.pop().unwrap_or_else(|| JsonRpcResponse::missing(0)).decode(operation)
    }

    /// Looks up one transaction. A protocol or decode failure is reported as
    /// `None`; only transport failures abort the caller.
    async fn verify_transaction(&self, hash: B256) -> Result<Option<RpcTransaction>, RpcError> {
        match self.request::<Option<RpcTransaction>>("eth_getTransactionByHash", json!([hash])).await
        {
            Ok(transaction) => Ok(transaction),
            Err(e @ RpcError::Transport { .. }) => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, tx_hash = %hash, "Skipping unverifiable transaction.");
                Ok(None)
            }
        }
    }
}

/// Puts `responses` in the order of `ids`, synthesizing an error for every
/// id the node did not answer.
fn align_responses(ids: &[u64], responses: Vec<JsonRpcResponse>) -> Vec<JsonRpcResponse> {
    // A lone response without id (e.g. a parse error) answers a lone request.
    if let ([id], [response]) = (ids, responses.as_slice()) {
        if response.id.is_none() {
            let mut response = response.clone();
            response.id = Some(*id);
            return vec![response];
        }
    }

    let mut by_id: HashMap<u64, JsonRpcResponse> = HashMap::with_capacity(responses.len());
    for response in responses {
        if let Some(id) = response.id {
            by_id.entry(id).or_insert(response);
        }
    }
    ids.iter()
        .map(|id| by_id.remove(id).unwrap_or_else(|| JsonRpcResponse::missing(*id)))
        .collect()
}

#[async_trait]
impl ChainSource for RpcGateway {
    #[tracing::instrument(skip(self, requests), fields(batch_size = requests.len()), level = "debug")]
    async fn batch_call(
        &self,
        operation: &'static str,
        requests: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, RpcError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<u64> = requests.iter().map(|r| r.id).collect();
        let responses = align_responses(&ids, self.post(operation, &requests).await?);

        let failed = responses.iter().filter(|r| r.error.is_some()).count() as u64;
        if failed > 0 {
            self.failures.fetch_add(failed, Ordering::Relaxed);
            tracing::debug!(failed, "Batch returned item errors.");
        }
        Ok(responses)
    }

    #[tracing::instrument(skip(self, data), level = "debug")]
    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        self.request("eth_call", eth_call_params(to, &data)).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_latest_block_number(&self) -> Result<u64, RpcError> {
        let operation = "eth_blockNumber";
        let quantity: String = self.request(operation, json!([])).await?;
        let block_number =
            parse_hex_quantity(&quantity).map_err(|e| RpcError::decode(operation, e))?;
        tracing::debug!(current_block = block_number, "Fetched latest block number.");
        Ok(block_number)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_block_range(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<BlockActivity>, RpcError> {
        let operation = "eth_getBlockByNumber";
        if end < start {
            return Err(RpcError::InvalidRange { from: start, to: end });
        }

        let requests = (start..=end)
            .enumerate()
            .map(|(i, number)| {
                JsonRpcRequest::new(i as u64, operation, json!([to_hex_quantity(number), true]))
            })
            .collect();
        let responses = self.batch_call(operation, requests).await?;

        let mut blocks = BTreeMap::new();
        for response in responses {
            let block = match response.decode::<Option<RpcBlock>>(operation) {
                Ok(Some(block)) => block,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "Dropping block missing from batch.");
                    continue;
                }
            };

            let mut activity = BlockActivity::new(block.number, Some(block.timestamp));
            activity.worked_job_addresses.extend(
                block
                    .transactions
                    .iter()
                    .filter(|tx| is_work_call(&tx.input))
                    .filter_map(|tx| tx.to.map(JobAddress::from)),
            );
            blocks.insert(block.number, activity);
        }

        tracing::debug!(start, end, blocks_returned = blocks.len(), "Fetched block range.");
        Ok(blocks.into_values().collect())
    }

    #[tracing::instrument(skip(self, addresses), fields(job_count = addresses.len()), level = "debug")]
    async fn get_work_transactions_by_logs(
        &self,
        addresses: &[JobAddress],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<BlockActivity>, RpcError> {
        if to_block < from_block {
            return Err(RpcError::InvalidRange { from: from_block, to: to_block });
        }
        let requested = to_block - from_block + 1;
        if requested > LOGS_MAX_BLOCK_RANGE {
            return Err(RpcError::RangeTooLarge { requested, max: LOGS_MAX_BLOCK_RANGE });
        }
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let filter = json!([{
            "address": addresses,
            "fromBlock": to_hex_quantity(from_block),
            "toBlock": to_hex_quantity(to_block),
        }]);
        let logs: Vec<RpcLog> = self.request("eth_getLogs", filter).await?;

        // First log per transaction wins; it carries the block context.
        let mut seen = HashSet::new();
        let candidates: Vec<&RpcLog> = logs
            .iter()
            .filter(|log| log.transaction_hash.is_some_and(|hash| seen.insert(hash)))
            .collect();
        tracing::debug!(logs = logs.len(), candidates = candidates.len(), "Fetched job logs.");

        let monitored: HashSet<Address> = addresses.iter().map(JobAddress::address).collect();
        let mut blocks: BTreeMap<u64, BlockActivity> = BTreeMap::new();

        for log in candidates {
            let Some(hash) = log.transaction_hash else { continue };
            let Some(transaction) = self.verify_transaction(hash).await? else { continue };

            let Some(to) = transaction.to.filter(|to| monitored.contains(to)) else { continue };
            if !is_work_call(&transaction.input) {
                continue;
            }
            let Some(block_number) = transaction.block_number.or(log.block_number) else {
                continue;
            };

            blocks
                .entry(block_number)
                .or_insert_with(|| BlockActivity::new(block_number, log.block_timestamp))
                .worked_job_addresses
                .insert(JobAddress::from(to));
        }

        Ok(blocks.into_values().collect())
    }

    fn stats(&self) -> RpcStats {
        RpcStats {
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::test_helpers::{
        BlockBuilder, TransactionBuilder, fast_rpc_retry, job, log_json, rpc_error, rpc_result,
        tx_hash,
    };

    fn gateway(server: &mockito::Server, max_attempts: u32) -> RpcGateway {
        let url = Url::parse(&server.url()).unwrap();
        RpcGateway::from_config(url, &fast_rpc_retry(max_attempts), &Default::default()).unwrap()
    }

    fn method(name: &str) -> Matcher {
        Matcher::Regex(format!(r#""method":"{name}""#))
    }

    #[tokio::test]
    async fn test_single_request_accepts_bare_object_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .match_body(method("eth_blockNumber"))
            .with_body(rpc_result(0, json!("0x1b4")).to_string())
            .create_async()
            .await;

        let gateway = gateway(&server, 1);
        assert_eq!(gateway.get_latest_block_number().await.unwrap(), 436);
        assert_eq!(gateway.stats(), RpcStats { requests: 1, failures: 0 });
    }

    #[tokio::test]
    async fn test_single_request_accepts_array_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_body(json!([rpc_result(0, json!("0x10"))]).to_string())
            .create_async()
            .await;

        assert_eq!(gateway(&server, 1).get_latest_block_number().await.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_batch_call_aligns_out_of_order_responses() {
        let mut server = mockito::Server::new_async().await;
        let body = json!([rpc_result(2, json!("c")), rpc_error(0, -32000, "boom")]);
        let _mock = server.mock("POST", "/").with_body(body.to_string()).create_async().await;

        let gateway = gateway(&server, 1);
        let requests =
            (0..3).map(|i| JsonRpcRequest::new(i, "eth_chainId", json!([]))).collect();
        let responses = gateway.batch_call("test", requests).await.unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].error.as_ref().map(|e| e.code), Some(-32000));
        assert_eq!(responses[1].error.as_ref().map(|e| e.code), Some(-32603));
        assert_eq!(responses[2].result, Some(json!("c")));
        assert_eq!(gateway.stats(), RpcStats { requests: 1, failures: 2 });
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let responses = gateway(&server, 1).batch_call("test", Vec::new()).await.unwrap();

        assert!(responses.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_reported_as_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(500).expect(3).create_async().await;

        let gateway = gateway(&server, 3);
        let err = gateway.get_latest_block_number().await.unwrap_err();

        assert!(matches!(err, RpcError::Transport { operation: "eth_blockNumber", .. }));
        assert_eq!(gateway.stats(), RpcStats { requests: 1, failures: 1 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_object_becomes_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_body(rpc_error(0, -32000, "execution reverted").to_string())
            .create_async()
            .await;

        let err = gateway(&server, 1)
            .eth_call(Address::repeat_byte(1), Bytes::from_static(&[1, 2, 3, 4]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RpcError::Protocol { operation: "eth_call", code: -32000, ref message }
                if message == "execution reverted"
        ));
    }

    #[tokio::test]
    async fn test_eth_call_decodes_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .match_body(method("eth_call"))
            .with_body(rpc_result(0, json!("0x0102")).to_string())
            .create_async()
            .await;

        let data = gateway(&server, 1).eth_call(Address::ZERO, Bytes::new()).await.unwrap();
        assert_eq!(data, Bytes::from_static(&[1, 2]));
    }

    #[tokio::test]
    async fn test_block_range_reports_work_recipients_and_drops_missing_blocks() {
        let mut server = mockito::Server::new_async().await;
        let block_100 = BlockBuilder::new(100)
            .transaction(TransactionBuilder::new(tx_hash(1)).to(job(0xaa)).work().build())
            .transaction(TransactionBuilder::new(tx_hash(2)).to(job(0xbb)).input("0xdeadbeef").build())
            .transaction(TransactionBuilder::new(tx_hash(3)).work().build())
            .build();
        let block_102 = BlockBuilder::new(102)
            .transaction(TransactionBuilder::new(tx_hash(4)).to(job(0xcc)).work().build())
            .build();
        let body = json!([
            rpc_result(2, block_102),
            rpc_result(1, Value::Null),
            rpc_result(0, block_100),
        ]);
        let _mock = server
            .mock("POST", "/")
            .match_body(method("eth_getBlockByNumber"))
            .with_body(body.to_string())
            .create_async()
            .await;

        let blocks = gateway(&server, 1).get_block_range(100, 102).await.unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_number, 100);
        assert_eq!(blocks[0].worked_job_addresses.iter().collect::<Vec<_>>(), vec![&job(0xaa)]);
        assert_eq!(blocks[0].timestamp, Some(1_700_000_000 + 1200));
        assert_eq!(blocks[1].block_number, 102);
        assert!(blocks[1].worked_job_addresses.contains(&job(0xcc)));
    }

    #[tokio::test]
    async fn test_block_range_rejects_inverted_range() {
        let server = mockito::Server::new_async().await;
        let err = gateway(&server, 1).get_block_range(10, 9).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidRange { from: 10, to: 9 }));
    }

    #[tokio::test]
    async fn test_logs_rejects_range_over_limit_without_calling_node() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let err = gateway(&server, 1)
            .get_work_transactions_by_logs(&[job(1)], 0, 500)
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::RangeTooLarge { requested: 501, max: 500 }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_logs_without_addresses_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let blocks = gateway(&server, 1).get_work_transactions_by_logs(&[], 0, 10).await.unwrap();

        assert!(blocks.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_logs_are_deduplicated_and_verified() {
        let mut server = mockito::Server::new_async().await;
        let (a, b) = (job(0xaa), job(0xbb));
        let logs = json!([
            log_json(a, tx_hash(1), 50),
            log_json(a, tx_hash(1), 50),
            log_json(b, tx_hash(2), 50),
            log_json(b, tx_hash(3), 52),
        ]);
        let logs_mock = server
            .mock("POST", "/")
            .match_body(method("eth_getLogs"))
            .with_body(json!([rpc_result(0, logs)]).to_string())
            .expect(1)
            .create_async()
            .await;

        let verified = [
            (tx_hash(1), TransactionBuilder::new(tx_hash(1)).to(a).work().block_number(50)),
            (tx_hash(2), TransactionBuilder::new(tx_hash(2)).to(b).work().block_number(50)),
            // Emitted a log, but was not a work call.
            (tx_hash(3), TransactionBuilder::new(tx_hash(3)).to(b).input("0x12345678").block_number(52)),
        ];
        let mut tx_mocks = Vec::new();
        for (hash, builder) in verified {
            tx_mocks.push(
                server
                    .mock("POST", "/")
                    .match_body(Matcher::Regex(format!("eth_getTransactionByHash.*{hash}")))
                    .with_body(json!([rpc_result(0, builder.build())]).to_string())
                    .expect(1)
                    .create_async()
                    .await,
            );
        }

        let gateway = gateway(&server, 1);
        let blocks = gateway.get_work_transactions_by_logs(&[a, b], 40, 60).await.unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_number, 50);
        assert_eq!(blocks[0].worked_job_addresses.len(), 2);
        assert_eq!(gateway.stats().requests, 4);
        logs_mock.assert_async().await;
        for mock in tx_mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_logs_skip_transactions_the_node_does_not_know() {
        let mut server = mockito::Server::new_async().await;
        let _logs = server
            .mock("POST", "/")
            .match_body(method("eth_getLogs"))
            .with_body(json!([rpc_result(0, json!([log_json(job(1), tx_hash(9), 5)]))]).to_string())
            .create_async()
            .await;
        let _tx = server
            .mock("POST", "/")
            .match_body(method("eth_getTransactionByHash"))
            .with_body(json!([rpc_result(0, Value::Null)]).to_string())
            .create_async()
            .await;

        let blocks =
            gateway(&server, 1).get_work_transactions_by_logs(&[job(1)], 0, 10).await.unwrap();
        assert!(blocks.is_empty());
    }
}
