use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;

use crate::errors::{PipelineError, PipelineResult};
use crate::ipea::html::extract_tables;
use crate::ipea::objects::{RawTable, RawTableRow, SourceSettings};

const MAX_JITTER_MS: u64 = 250;

// Anything that can hand back the HTML page holding the series.
// The live implementation talks to IPEA; tests plug in canned pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    fn url(&self) -> &str;
    async fn fetch_page(&self) -> PipelineResult<String>;
}

pub struct HttpPageSource {
    client: reqwest::Client,
    settings: SourceSettings,
}

enum Attempt {
    Done(String),
    Retry(String),
    Fatal(String),
}

impl HttpPageSource {
    pub fn new(settings: SourceSettings) -> PipelineResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("text/html"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .default_headers(headers)
            .user_agent(concat!("brentlib/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::source_unavailable(&settings.url, e))?;

        Ok(HttpPageSource { client, settings })
    }

    async fn attempt(&self) -> Attempt {
        let response = match self.client.get(&self.settings.url).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() || err.is_connect() || err.is_request() => {
                return Attempt::Retry(err.to_string())
            }
            Err(err) => return Attempt::Fatal(err.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            let reason = format!("Received non-success status code: {}", status);
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Attempt::Retry(reason);
            }
            return Attempt::Fatal(reason);
        }

        match response.text().await {
            Ok(body) => Attempt::Done(body),
            Err(err) => Attempt::Retry(err.to_string()),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.settings.backoff_ms.saturating_mul(1u64 << attempt.min(16));
        let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
        Duration::from_millis(base + jitter)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    fn url(&self) -> &str {
        &self.settings.url
    }

    async fn fetch_page(&self) -> PipelineResult<String> {
        let url = &self.settings.url;
        let mut attempt = 0;

        loop {
            log::debug!("GET {} (attempt {})", url, attempt + 1);
            match self.attempt().await {
                Attempt::Done(body) => {
                    log::info!("Fetched {} bytes from {}", body.len(), url);
                    return Ok(body);
                }
                Attempt::Fatal(reason) => {
                    log::error!("Fetching {} failed: {}", url, reason);
                    return Err(PipelineError::source_unavailable(url, reason));
                }
                Attempt::Retry(reason) if attempt < self.settings.retries => {
                    let wait = self.backoff(attempt);
                    log::warn!(
                        "Fetching {} failed ({}), retrying in {}ms...",
                        url,
                        reason,
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Attempt::Retry(reason) => {
                    log::error!("Giving up on {} after {} attempts: {}", url, attempt + 1, reason);
                    return Err(PipelineError::source_unavailable(
                        url,
                        format!("{} (after {} attempts)", reason, attempt + 1),
                    ));
                }
            }
        }
    }
}

// Fetch the page and cut out the configured table, dropping the leading rows
// that repeat the header
pub async fn fetch_table(
    source: &dyn PageSource,
    settings: &SourceSettings,
) -> PipelineResult<RawTable> {
    let page = source.fetch_page().await?;
    select_table(&page, settings.table_index, settings.skip_rows)
}

pub fn select_table(page: &str, table_index: usize, skip_rows: usize) -> PipelineResult<RawTable> {
    let mut tables = extract_tables(page);
    log::debug!("Found {} tables in page", tables.len());

    if table_index >= tables.len() {
        return Err(PipelineError::SchemaMismatch {
            expected_index: table_index,
            found: format!("page only has {} tables", tables.len()),
        });
    }
    let table = tables.swap_remove(table_index);

    let columns = table.column_count();
    if columns < 2 {
        return Err(PipelineError::SchemaMismatch {
            expected_index: table_index,
            found: format!("table has {} columns, need at least 2", columns),
        });
    }

    let rows = table
        .rows
        .into_iter()
        .skip(skip_rows)
        .map(|cells| {
            let mut cells = cells.into_iter();
            RawTableRow {
                date_text: cells.next().unwrap_or_default(),
                price_text: cells.next().unwrap_or_default(),
            }
        })
        .collect();

    Ok(RawTable {
        header: table.header,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(data_rows: &str) -> String {
        format!(
            "<html><body>\
             <table><tr><td>menu</td></tr></table>\
             <table><tr><td>title</td></tr></table>\
             <table>\
               <tr><td>Data</td><td>Preço - petróleo bruto - Brent (FOB)</td></tr>\
               {}\
             </table>\
             </body></html>",
            data_rows
        )
    }

    #[test]
    fn selects_third_table_and_skips_header_row() {
        let html = page("<tr><td>02/01/2020</td><td>6625</td></tr><tr><td>03/01/2020</td><td>6860</td></tr>");
        let table = select_table(&html, 2, 1).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0],
            RawTableRow {
                date_text: "02/01/2020".into(),
                price_text: "6625".into()
            }
        );
    }

    #[test]
    fn missing_table_is_schema_mismatch() {
        let html = "<table><tr><td>a</td><td>b</td></tr></table>";
        match select_table(html, 2, 1) {
            Err(PipelineError::SchemaMismatch { expected_index, .. }) => assert_eq!(expected_index, 2),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn single_column_table_is_schema_mismatch() {
        let html = "<table></table><table></table><table><tr><td>only</td></tr></table>";
        assert!(matches!(
            select_table(html, 2, 0),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn short_rows_get_empty_price() {
        let html = page("<tr><td>02/01/2020</td></tr><tr><td>03/01/2020</td><td>6860</td></tr>");
        let table = select_table(&html, 2, 1).unwrap();
        assert_eq!(table.rows[0].price_text, "");
    }
}
