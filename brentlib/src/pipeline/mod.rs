use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::errors::{PipelineError, PipelineResult};
use crate::ipea::{fetch_table, PageSource};
use crate::models::{AdditiveModel, ForecastFrame, ForecastModel};
use crate::series::{adapt, normalize, validate, ForecastInput, NormalizeReport};
use crate::util::Settings;

pub mod cache;
pub use cache::ForecastCache;

pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Found { value: f64 },
    DateNotFound,
}

#[derive(Debug)]
pub struct Prediction {
    pub target_date: NaiveDate,
    pub horizon: i64,
    pub outcome: ForecastOutcome,
    pub message: String,
    pub model: AdditiveModel,
    pub history: ForecastInput,
    pub frame: ForecastFrame,
    pub report: NormalizeReport,
}

impl Prediction {
    pub fn value(&self) -> Option<f64> {
        match self.outcome {
            ForecastOutcome::Found { value } => Some(value),
            ForecastOutcome::DateNotFound => None,
        }
    }
}

pub fn parse_request_date(requested: &str) -> PipelineResult<NaiveDate> {
    NaiveDate::parse_from_str(requested.trim(), REQUEST_DATE_FORMAT).map_err(|e| {
        PipelineError::InvalidRequestDate {
            requested: requested.to_string(),
            last_observed: None,
            reason: format!("expected YYYY-MM-DD ({})", e),
        }
    })
}

// Whole days from the last observation to the target. Past and same-day
// targets are rejected instead of asking the model for a non-positive horizon,
// and so is anything past `max_horizon`.
pub fn horizon_days(
    target: NaiveDate,
    last_observed: NaiveDate,
    max_horizon: i64,
) -> PipelineResult<i64> {
    let horizon = (target - last_observed).num_days();
    if horizon > max_horizon {
        return Err(PipelineError::InvalidRequestDate {
            requested: target.format(REQUEST_DATE_FORMAT).to_string(),
            last_observed: Some(last_observed),
            reason: format!(
                "date is {} days past the last observation ({}), limit is {}",
                horizon, last_observed, max_horizon
            ),
        });
    }
    if horizon <= 0 {
        return Err(PipelineError::InvalidRequestDate {
            requested: target.format(REQUEST_DATE_FORMAT).to_string(),
            last_observed: Some(last_observed),
            reason: format!(
                "date must be after the last observation ({})",
                last_observed
            ),
        });
    }
    Ok(horizon)
}

pub fn format_message(target: NaiveDate, outcome: &ForecastOutcome) -> String {
    match outcome {
        ForecastOutcome::Found { value } => format!(
            "Predicted price for ({}): US$ {:.2}",
            target.format(REQUEST_DATE_FORMAT),
            value
        ),
        ForecastOutcome::DateNotFound => "Incorrect date".to_string(),
    }
}

// Exact-date lookup in the forecast frame
pub fn extract_prediction(frame: &ForecastFrame, target: NaiveDate) -> ForecastOutcome {
    match frame.lookup(target) {
        Some(row) => ForecastOutcome::Found { value: row.yhat },
        None => ForecastOutcome::DateNotFound,
    }
}

// Owns the page source, the settings and the memo cache for the lifetime of the serving process
pub struct Predictor {
    source: Arc<dyn PageSource>,
    settings: Settings,
    cache: ForecastCache<Prediction>,
}

impl Predictor {
    pub fn new(source: Arc<dyn PageSource>, settings: Settings) -> Self {
        Predictor {
            source,
            settings,
            cache: ForecastCache::new(),
        }
    }

    pub fn cache(&self) -> &ForecastCache<Prediction> {
        &self.cache
    }

    pub async fn predict(&self, requested: &str) -> PipelineResult<Arc<Prediction>> {
        let target = parse_request_date(requested)?;
        let key = target.format(REQUEST_DATE_FORMAT).to_string();

        self.cache
            .get_or_try_insert(&key, || self.run_pipeline(target))
            .await
    }

    // Runs requests side by side; repeated dates still resolve to one pipeline run each
    pub async fn predict_many(&self, requested: &[String]) -> Vec<PipelineResult<Arc<Prediction>>> {
        let futures = requested.iter().map(|r| self.predict(r));
        futures::future::join_all(futures).await
    }

    async fn run_pipeline(&self, target: NaiveDate) -> PipelineResult<Prediction> {
        log::info!("Running forecast pipeline for {}", target);

        // fetch -> normalize -> adapt
        let raw = fetch_table(self.source.as_ref(), &self.settings.source).await?;
        log::info!("Fetched table with {} rows from {}", raw.len(), self.source.url());

        let series = normalize(&raw, &self.settings.normalize);
        validate(&series, &self.settings.normalize, Utc::now().date_naive())?;
        let history = adapt(&series);

        let last_observed = history
            .last_date()
            .ok_or_else(|| PipelineError::DataFormat("no valid observations".to_string()))?;
        let horizon = horizon_days(target, last_observed, self.settings.model.max_horizon_days)?;
        log::info!("Last observation {}, horizon {} days", last_observed, horizon);

        // train -> forecast -> lookup
        let mut model = AdditiveModel::from_config(&self.settings.model);
        model.fit(&history)?;
        let dates = model.make_future_dates(horizon)?;
        let frame = model.predict(&dates)?;

        let outcome = extract_prediction(&frame, target);
        let message = format_message(target, &outcome);
        match outcome {
            ForecastOutcome::Found { value } => log::info!("{} -> {:.2}", target, value),
            ForecastOutcome::DateNotFound => log::warn!("{} not present in forecast frame", target),
        }

        Ok(Prediction {
            target_date: target,
            horizon,
            outcome,
            message,
            model,
            history,
            frame,
            report: series.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForecastRow;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn horizon_counts_whole_days() {
        assert_eq!(horizon_days(day(2020, 1, 15), day(2020, 1, 10), 3650).unwrap(), 5);
        assert_eq!(horizon_days(day(2021, 1, 1), day(2020, 12, 31), 3650).unwrap(), 1);
    }

    #[test]
    fn far_future_targets_are_rejected() {
        let target = parse_request_date("9999-12-31").unwrap();
        assert!(matches!(
            horizon_days(target, day(2024, 1, 10), 3650),
            Err(PipelineError::InvalidRequestDate { .. })
        ));
        assert_eq!(horizon_days(day(2024, 1, 20), day(2024, 1, 10), 10).unwrap(), 10);
        assert!(horizon_days(day(2024, 1, 21), day(2024, 1, 10), 10).is_err());
    }

    #[test]
    fn same_day_and_past_targets_are_rejected() {
        for target in [day(2020, 1, 10), day(2019, 1, 1)] {
            match horizon_days(target, day(2020, 1, 10), 3650) {
                Err(PipelineError::InvalidRequestDate { last_observed, .. }) => {
                    assert_eq!(last_observed, Some(day(2020, 1, 10)))
                }
                other => panic!("expected InvalidRequestDate, got {:?}", other),
            }
        }
    }

    #[test]
    fn request_dates_must_be_iso() {
        assert_eq!(parse_request_date("2020-01-15").unwrap(), day(2020, 1, 15));
        assert_eq!(parse_request_date(" 2020-01-15\n").unwrap(), day(2020, 1, 15));
        assert!(matches!(
            parse_request_date("15/01/2020"),
            Err(PipelineError::InvalidRequestDate { .. })
        ));
    }

    #[test]
    fn lookup_is_exact_and_message_is_formatted() {
        let frame = ForecastFrame {
            rows: vec![ForecastRow {
                ds: day(2020, 1, 15),
                trend: 114.0,
                weekly: 0.0,
                yearly: 0.0,
                yhat: 114.004,
                yhat_lower: 113.0,
                yhat_upper: 115.0,
            }],
        };

        let found = extract_prediction(&frame, day(2020, 1, 15));
        assert_eq!(found, ForecastOutcome::Found { value: 114.004 });
        assert_eq!(
            format_message(day(2020, 1, 15), &found),
            "Predicted price for (2020-01-15): US$ 114.00"
        );

        let missing = extract_prediction(&frame, day(2020, 1, 16));
        assert_eq!(missing, ForecastOutcome::DateNotFound);
        assert_eq!(format_message(day(2020, 1, 16), &missing), "Incorrect date");
    }
}
