use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::{PipelineError, PipelineResult};
use crate::ipea::helpers::{parse_date_text, parse_price_text};
use crate::ipea::objects::RawTable;
use crate::series::NormalizeSettings;

// One row of the canonical (date, price) series. Invalid cells stay in the
// series as `None` so they can be counted; they are dropped by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub price: Option<f64>,
}

impl Observation {
    pub fn is_valid(&self) -> bool {
        self.date.is_some() && self.price.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub rows: usize,
    pub invalid_dates: usize,
    pub invalid_prices: usize,
    pub excluded_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    pub observations: Vec<Observation>,
    pub report: NormalizeReport,
}

impl NormalizedSeries {
    pub fn valid(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(|o| o.is_valid())
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.iter().filter_map(|o| o.date).max()
    }
}

pub fn normalize(raw: &RawTable, settings: &NormalizeSettings) -> NormalizedSeries {
    let mut observations: Vec<Observation> = raw
        .rows
        .iter()
        .map(|row| Observation {
            index: 0,
            date: parse_date_text(&row.date_text, &settings.date_format),
            price: parse_price_text(
                &row.price_text,
                settings.thousands_separator,
                settings.price_scale,
            ),
        })
        .collect();

    // Chronological order, unparseable dates go last (stable for equal dates)
    observations.sort_by_key(|o| (o.date.is_none(), o.date));
    for (i, observation) in observations.iter_mut().enumerate() {
        observation.index = i;
    }

    let report = NormalizeReport {
        rows: observations.len(),
        invalid_dates: observations.iter().filter(|o| o.date.is_none()).count(),
        invalid_prices: observations.iter().filter(|o| o.price.is_none()).count(),
        excluded_rows: observations.iter().filter(|o| !o.is_valid()).count(),
    };

    if report.excluded_rows > 0 {
        log::warn!(
            "{} of {} rows flagged ({} bad dates, {} bad prices)",
            report.excluded_rows,
            report.rows,
            report.invalid_dates,
            report.invalid_prices
        );
    }
    log::info!("Normalized {} rows", report.rows);

    NormalizedSeries {
        observations,
        report,
    }
}

// Catch provider-side format changes before they reach the model:
// too many rows lost, dates outside the plausible window, or prices on the wrong scale
pub fn validate(
    series: &NormalizedSeries,
    settings: &NormalizeSettings,
    today: NaiveDate,
) -> PipelineResult<()> {
    let report = &series.report;
    if report.rows == 0 {
        return Err(PipelineError::DataFormat("table has no data rows".to_string()));
    }

    let valid_rows = report.rows - report.excluded_rows;
    if valid_rows == 0 {
        return Err(PipelineError::DataFormat(format!(
            "none of the {} rows could be parsed (date format '{}')",
            report.rows, settings.date_format
        )));
    }

    let invalid_ratio = report.excluded_rows as f64 / report.rows as f64;
    if invalid_ratio > settings.max_invalid_ratio {
        return Err(PipelineError::DataFormat(format!(
            "{} of {} rows could not be parsed ({:.0}% > {:.0}% allowed)",
            report.excluded_rows,
            report.rows,
            invalid_ratio * 100.0,
            settings.max_invalid_ratio * 100.0
        )));
    }

    let latest_allowed = today.succ_opt().unwrap_or(today);
    if let Some(bad) = series
        .valid()
        .filter_map(|o| o.date)
        .find(|d| *d < settings.earliest_date || *d > latest_allowed)
    {
        return Err(PipelineError::DataFormat(format!(
            "parsed date {} outside expected range {}..={}",
            bad, settings.earliest_date, latest_allowed
        )));
    }

    let mut prices: Vec<f64> = series.valid().filter_map(|o| o.price).collect();
    prices.sort_by(|a, b| a.total_cmp(b));
    let median = prices[prices.len() / 2];
    if median < settings.price_min || median > settings.price_max {
        return Err(PipelineError::DataFormat(format!(
            "median price {:.4} outside expected range {}..{} (scale {})",
            median, settings.price_min, settings.price_max, settings.price_scale
        )));
    }

    Ok(())
}
