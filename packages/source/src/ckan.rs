//! Paginated CKAN Datastore API fetcher.
//!
//! The fallback source when the CSV snapshot is unavailable. Fetches
//! sequential pages from a `datastore_search` endpoint until the
//! accumulated count reaches the server-reported total or the configured
//! hard cap, whichever is smaller, reporting progress after every page.
//!
//! There is no partial-success mode: any failed page aborts the fetch
//! and the caller discards whatever was already accumulated.

use std::sync::Arc;

use async_trait::async_trait;

use crate::progress::ProgressCallback;
use crate::registry::DatastoreConfig;
use crate::retry;
use crate::{FetchOptions, RequestSource, SourceError, USER_AGENT};

/// The paginated CKAN datastore source.
#[derive(Debug, Clone)]
pub struct DatastoreSource {
    config: DatastoreConfig,
}

impl DatastoreSource {
    /// Creates a datastore source from its dataset configuration.
    #[must_use]
    pub const fn new(config: DatastoreConfig) -> Self {
        Self { config }
    }
}

/// Computes the `limit` parameter for the next page request, or `None`
/// when the fetch loop should stop.
///
/// The budget is the smaller of the server-reported total (once known)
/// and the hard cap; each page requests at most `page_size` of whatever
/// budget remains.
#[must_use]
pub fn next_page_limit(
    fetched: u64,
    page_size: u64,
    server_total: Option<u64>,
    cap: u64,
) -> Option<u64> {
    let budget = cap.min(server_total.unwrap_or(u64::MAX));
    let remaining = budget.saturating_sub(fetched);
    if remaining == 0 {
        None
    } else {
        Some(remaining.min(page_size))
    }
}

/// Extracts `(server_total, records)` from a datastore response body.
///
/// # Errors
///
/// Returns [`SourceError::Api`] when the body carries `success != true`
/// or lacks a `result.records` array.
pub fn parse_page(
    body: &serde_json::Value,
    offset: u64,
) -> Result<(Option<u64>, Vec<serde_json::Value>), SourceError> {
    if body.get("success").and_then(serde_json::Value::as_bool) != Some(true) {
        return Err(SourceError::Api {
            message: format!("success=false at offset {offset}"),
        });
    }

    let result = body.get("result").ok_or_else(|| SourceError::Api {
        message: format!("response missing 'result' at offset {offset}"),
    })?;

    let total = result.get("total").and_then(serde_json::Value::as_u64);

    let records = result
        .get("records")
        .and_then(serde_json::Value::as_array)
        .cloned()
        .ok_or_else(|| SourceError::Api {
            message: format!("response missing 'result.records' at offset {offset}"),
        })?;

    Ok((total, records))
}

#[async_trait]
impl RequestSource for DatastoreSource {
    fn id(&self) -> &'static str {
        "datastore"
    }

    async fn fetch(
        &self,
        options: &FetchOptions,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        let cap = self
            .config
            .max_records
            .min(options.limit.unwrap_or(u64::MAX));
        let mut all_records: Vec<serde_json::Value> = Vec::new();
        let mut server_total: Option<u64> = None;

        progress.set_message("fetching from datastore API".to_string());

        while let Some(page_limit) = next_page_limit(
            all_records.len() as u64,
            self.config.page_size,
            server_total,
            cap,
        ) {
            let offset = all_records.len() as u64;
            log::info!("Fetching datastore page: offset={offset}, limit={page_limit}");

            let body = retry::send_json(|| {
                client.get(&self.config.api_url).query(&[
                    ("resource_id", self.config.resource_id.as_str()),
                    ("limit", &page_limit.to_string()),
                    ("offset", &offset.to_string()),
                ])
            })
            .await?;

            let (total, records) = parse_page(&body, offset)?;

            if server_total.is_none()
                && let Some(total) = total
            {
                server_total = Some(total);
                progress.set_total(total.min(cap));
                log::info!("Datastore reports {total} records total");
            }

            let count = records.len() as u64;
            if count == 0 {
                break;
            }

            all_records.extend(records);
            progress.set_position(all_records.len() as u64);

            if count < page_limit {
                break;
            }

            if self.config.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.config.delay_ms)).await;
            }
        }

        log::info!("Fetched {} datastore records total", all_records.len());
        Ok(all_records)
    }
}
