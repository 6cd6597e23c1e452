//! REST transaction API client
//!
//! Fetches transaction pages from the upstream API's paginated JSON
//! envelope: `{ success, message, data: { items, pageNumber, pageSize,
//! totalCount, totalPages, hasPreviousPage, hasNextPage }, statusCode,
//! errors }`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;

use crate::adapters::transactions::TransactionDto;
use crate::domain::result::{Error, Result};
use crate::ports::{PageFetcher, TransactionPage, TransactionQuery};

/// Upstream calls are bounded; a hung API must not stall a balance run
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// API response models (matching the transaction API envelope)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    #[allow(dead_code)]
    status_code: i32,
    #[serde(default)]
    errors: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginatedData {
    #[serde(default)]
    items: Vec<TransactionDto>,
    #[serde(default)]
    #[allow(dead_code)]
    page_number: u32,
    #[serde(default)]
    #[allow(dead_code)]
    page_size: u32,
    #[serde(default)]
    #[allow(dead_code)]
    total_count: u64,
    #[serde(default)]
    #[allow(dead_code)]
    total_pages: u32,
    #[serde(default)]
    has_next_page: bool,
}

// =============================================================================
// REST page fetcher
// =============================================================================

/// [`PageFetcher`] over the upstream's paginated GET endpoint
#[derive(Debug)]
pub struct RestPageFetcher {
    client: Client,
    base_url: String,
}

impl RestPageFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        if base_url.is_empty() {
            return Err(Error::Config(
                "transaction API base URL cannot be empty".to_string(),
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
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn page_url(&self, query: TransactionQuery, page_number: u32, page_size: u32) -> String {
        let mut url = format!(
            "{}/api/transactions?pageNumber={}&pageSize={}",
            self.base_url, page_number, page_size
        );
        match query {
            TransactionQuery::All => {}
            TransactionQuery::ByDate(date) => {
                url.push_str(&format!("&date={}", date.format("%Y-%m-%d")));
            }
            TransactionQuery::ByPeriod { start, end } => {
                url.push_str(&format!(
                    "&startDate={}&endDate={}",
                    start.format("%Y-%m-%d"),
                    end.format("%Y-%m-%d")
                ));
            }
        }
        url
    }
}

#[async_trait]
impl PageFetcher for RestPageFetcher {
    async fn fetch_page(
        &self,
        query: TransactionQuery,
        page_number: u32,
        page_size: u32,
    ) -> Result<TransactionPage> {
        let url = self.page_url(query, page_number, page_size);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::communication(format!(
                "transaction API returned HTTP {}",
                status.as_u16()
            )));
        }

        let envelope: ApiResponse<PaginatedData> = response.json().await.map_err(|e| {
            Error::communication(format!("failed to parse transaction API response: {}", e))
        })?;

        if !envelope.success {
            let detail = envelope
                .errors
                .filter(|errors| !errors.is_empty())
                .map(|errors| errors.join("; "))
                .or(envelope.message)
                .unwrap_or_else(|| "no detail provided".to_string());
            return Err(Error::communication(format!(
                "transaction API reported failure: {}",
                detail
            )));
        }

        let data = envelope.data.ok_or_else(|| {
            Error::communication("transaction API success response carried no data".to_string())
        })?;

        Ok(TransactionPage {
            items: data
                .items
                .into_iter()
                .map(TransactionDto::into_transaction)
                .collect(),
            has_next_page: data.has_next_page,
        })
    }
}

/// Map transport-level errors to the communication kind
fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::communication("transaction API request timed out")
    } else if error.is_connect() {
        Error::communication("unable to connect to the transaction API")
    } else {
        Error::communication(format!("transaction API request failed: {}", error))
    }
}
