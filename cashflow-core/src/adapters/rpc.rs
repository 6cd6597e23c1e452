//! RPC transaction API client
//!
//! The remote-procedure flavour of the upstream: a single JSON-RPC 2.0
//! endpoint whose `transactions.getPage` method takes `{pageNumber,
//! pageSize}` plus the optional date filters and returns `{items,
//! hasNextPage}`. Interchangeable with the REST transport behind
//! [`PageFetcher`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::adapters::rest::REQUEST_TIMEOUT;
use crate::adapters::transactions::TransactionDto;
use crate::domain::result::{Error, Result};
use crate::ports::{PageFetcher, TransactionPage, TransactionQuery};

const METHOD_GET_PAGE: &str = "transactions.getPage";

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: RpcPageParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RpcPageParams {
    page_number: u32,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<RpcPageResult>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcPageResult {
    #[serde(default)]
    items: Vec<TransactionDto>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    data: Option<JsonValue>,
}

/// [`PageFetcher`] over the upstream's JSON-RPC endpoint
#[derive(Debug)]
pub struct RpcPageFetcher {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcPageFetcher {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(Error::Config(
                "transaction RPC endpoint cannot be empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("cashflow/0.1"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::communication(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    fn page_params(query: TransactionQuery, page_number: u32, page_size: u32) -> RpcPageParams {
        let mut params = RpcPageParams {
            page_number,
            page_size,
            date: None,
            start_date: None,
            end_date: None,
        };
        match query {
            TransactionQuery::All => {}
            TransactionQuery::ByDate(date) => {
                params.date = Some(date.format("%Y-%m-%d").to_string());
            }
            TransactionQuery::ByPeriod { start, end } => {
                params.start_date = Some(start.format("%Y-%m-%d").to_string());
                params.end_date = Some(end.format("%Y-%m-%d").to_string());
            }
        }
        params
    }
}

#[async_trait]
impl PageFetcher for RpcPageFetcher {
    async fn fetch_page(
        &self,
        query: TransactionQuery,
        page_number: u32,
        page_size: u32,
    ) -> Result<TransactionPage> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: METHOD_GET_PAGE,
            params: Self::page_params(query, page_number, page_size),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::communication("transaction RPC request timed out")
                } else if e.is_connect() {
                    Error::communication("unable to connect to the transaction RPC endpoint")
                } else {
                    Error::communication(format!("transaction RPC request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::communication(format!(
                "transaction RPC endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: RpcResponse = response.json().await.map_err(|e| {
            Error::communication(format!("failed to parse transaction RPC response: {}", e))
        })?;

        if let Some(error) = body.error {
            return Err(Error::communication(format!(
                "transaction RPC call failed ({}): {}",
                error.code, error.message
            )));
        }

        let result = body.result.ok_or_else(|| {
            Error::communication("transaction RPC response carried neither result nor error".to_string())
        })?;

        Ok(TransactionPage {
            items: result
                .items
                .into_iter()
                .map(TransactionDto::into_transaction)
                .collect(),
            has_next_page: result.has_next_page,
        })
    }
}
