//! CSV snapshot decoding and download.
//!
//! [`decode`] turns delimited text into ordered records keyed by the
//! header row. [`SnapshotSource`] downloads the static CSV snapshot
//! (optionally gzip-compressed) and its companion metadata document.

use std::io::Read as _;
use std::sync::Arc;

use async_trait::async_trait;

use crate::progress::ProgressCallback;
use crate::registry::SnapshotConfig;
use crate::retry;
use crate::{DatasetMetadata, FetchOptions, RequestSource, SourceError, USER_AGENT};

/// Decodes CSV text into one JSON object per row, keyed by the trimmed
/// header tokens from the first line.
///
/// Quoted fields may contain commas, doubled quotes (decoded to one
/// literal quote), and newlines. `\r\n`/`\r` line endings are normalized
/// to `\n` before parsing. Headers and fields are trimmed. Rows with
/// fewer values than headers have the missing trailing fields filled with
/// empty strings; structurally unreadable rows are skipped, never fatal.
/// Input without a data row decodes to an empty sequence.
#[must_use]
pub fn decode(text: &str) -> Vec<serde_json::Value> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(normalized.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(|h| h.trim().to_owned()).collect(),
        Err(e) => {
            log::warn!("CSV header row unreadable: {e}");
            return Vec::new();
        }
    };

    if headers.is_empty() {
        return Vec::new();
    }

    let mut records: Vec<serde_json::Value> = Vec::new();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping unreadable CSV row: {e}");
                continue;
            }
        };

        let mut map = serde_json::Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("").trim().to_owned();
            map.insert(header.clone(), serde_json::Value::String(value));
        }
        records.push(serde_json::Value::Object(map));
    }

    records
}

/// The static CSV snapshot resource produced by the offline fetch job.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    config: SnapshotConfig,
}

impl SnapshotSource {
    /// Creates a snapshot source from its dataset configuration.
    #[must_use]
    pub const fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    fn build_client() -> Result<reqwest::Client, SourceError> {
        Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
    }
}

#[async_trait]
impl RequestSource for SnapshotSource {
    fn id(&self) -> &'static str {
        "snapshot"
    }

    async fn fetch(
        &self,
        options: &FetchOptions,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let client = Self::build_client()?;

        progress.set_message("downloading snapshot".to_string());
        let bytes = retry::send_bytes(|| client.get(&self.config.csv_url)).await?;
        log::debug!(
            "Downloaded {} bytes from {}",
            bytes.len(),
            self.config.csv_url
        );

        let csv_bytes: Vec<u8> = if self.config.compressed.as_deref() == Some("gzip") {
            let mut decoder = flate2::read::GzDecoder::new(bytes.as_slice());
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed)?;
            log::debug!("Decompressed to {} bytes", decompressed.len());
            decompressed
        } else {
            bytes
        };

        let text = String::from_utf8_lossy(&csv_bytes);
        let mut records = decode(&text);

        if records.is_empty() {
            return Err(SourceError::EmptySnapshot);
        }

        let cap = self
            .config
            .max_records
            .min(options.limit.unwrap_or(u64::MAX));
        if (records.len() as u64) > cap {
            log::info!("Snapshot truncated to the {cap}-record cap");
            records.truncate(usize::try_from(cap).unwrap_or(usize::MAX));
        }

        log::info!("Parsed {} records from snapshot CSV", records.len());
        progress.inc(records.len() as u64);

        Ok(records)
    }

    async fn metadata(&self) -> Option<DatasetMetadata> {
        let url = self.config.metadata_url.as_deref()?;
        let client = Self::build_client().ok()?;
        let response = client.get(url).send().await.ok()?;
        let metadata = response.json::<DatasetMetadata>().await.ok()?;
        log::debug!("Snapshot metadata: last_updated={:?}", metadata.last_updated);
        Some(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(record: &'a serde_json::Value, key: &str) -> &'a str {
        record.get(key).and_then(serde_json::Value::as_str).unwrap()
    }

    #[test]
    fn decodes_headers_and_rows() {
        let rows = decode("case_id,neighborhood\n101,Dorchester\n102,Roxbury\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(field(&rows[0], "case_id"), "101");
        assert_eq!(field(&rows[1], "neighborhood"), "Roxbury");
    }

    #[test]
    fn quoted_fields_keep_commas_and_unescape_quotes() {
        let rows = decode("id,address\n1,\"100 Main St, Apt \"\"B\"\"\"\n");
        assert_eq!(field(&rows[0], "address"), "100 Main St, Apt \"B\"");
    }

    #[test]
    fn trims_headers_and_fields() {
        let rows = decode(" id , status \n 1 , Open \n");
        assert_eq!(field(&rows[0], "id"), "1");
        assert_eq!(field(&rows[0], "status"), "Open");
    }

    #[test]
    fn normalizes_carriage_returns() {
        let rows = decode("id,status\r\n1,Open\r2,Closed\r\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(field(&rows[1], "status"), "Closed");
    }

    #[test]
    fn short_rows_fill_missing_trailing_fields() {
        let rows = decode("id,status,neighborhood\n1,Open\n");
        assert_eq!(field(&rows[0], "status"), "Open");
        assert_eq!(field(&rows[0], "neighborhood"), "");
    }

    #[test]
    fn header_only_input_yields_nothing() {
        assert!(decode("id,status\n").is_empty());
        assert!(decode("id,status").is_empty());
        assert!(decode("").is_empty());
    }

    #[test]
    fn round_trips_through_csv_encoding() {
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        writer.write_record(["id", "address", "note"]).unwrap();
        writer
            .write_record(["1", "100 Main St, Apt \"B\"", "line one\nline two"])
            .unwrap();
        let encoded = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let rows = decode(&encoded);
        assert_eq!(rows.len(), 1);
        assert_eq!(field(&rows[0], "address"), "100 Main St, Apt \"B\"");
        assert_eq!(field(&rows[0], "note"), "line one\nline two");
    }
}
