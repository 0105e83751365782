use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod normalizer;
pub use normalizer::*;

pub mod adapter;
pub use adapter::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    #[serde(rename = "priceScale")]
    pub price_scale: f64,
    #[serde(rename = "dateFormat")]
    pub date_format: String,
    #[serde(rename = "thousandsSeparator")]
    pub thousands_separator: char,
    #[serde(rename = "maxInvalidRatio")]
    pub max_invalid_ratio: f64,
    #[serde(rename = "earliestDate")]
    pub earliest_date: NaiveDate,
    #[serde(rename = "priceMin")]
    pub price_min: f64,
    #[serde(rename = "priceMax")]
    pub price_max: f64,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        NormalizeSettings {
            price_scale: 100.0,
            date_format: "%d/%m/%Y".to_string(),
            thousands_separator: ',',
            max_invalid_ratio: 0.5,
            // The Brent series starts in 1987
            earliest_date: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or_default(),
            // Brent has traded between roughly 9 and 150 US$ since 1987
            price_min: 5.0,
            price_max: 500.0,
        }
    }
}
