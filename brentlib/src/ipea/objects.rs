use serde::{Deserialize, Serialize};

// Brent (FOB) daily spot price series, US$ per barrel
pub const IPEA_BRENT_URL: &str =
    "http://www.ipeadata.gov.br/ExibeSerie.aspx?module=m&serid=1650971490&oper=view";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub url: String,
    #[serde(rename = "tableIndex")]
    pub table_index: usize,
    #[serde(rename = "skipRows")]
    pub skip_rows: usize,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: u64,
    pub retries: u32,
    #[serde(rename = "backoffMs")]
    pub backoff_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        SourceSettings {
            url: IPEA_BRENT_URL.to_string(),
            table_index: 2,
            skip_rows: 1,
            timeout_ms: 30_000,
            retries: 3,
            backoff_ms: 500,
        }
    }
}

// One <table> as found in the page, cell text already cleaned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

// Positional (date-text, price-text) pair straight from the scraped table
#[derive(Debug, Clone, PartialEq)]
pub struct RawTableRow {
    pub date_text: String,
    pub price_text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<RawTableRow>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
