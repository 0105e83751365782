use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineResult;
use crate::models::forecast_frame::{Decomposition, ForecastFrame};
use crate::series::ForecastInput;

pub trait ForecastModel {
    fn from_config(config: &ModelConfig) -> Self
    where
        Self: Sized;

    fn fit(&mut self, input: &ForecastInput) -> PipelineResult<()>;

    // History dates followed by `periods` consecutive days after the last observation
    fn make_future_dates(&self, periods: i64) -> PipelineResult<Vec<NaiveDate>>;

    fn predict(&self, dates: &[NaiveDate]) -> PipelineResult<ForecastFrame>;

    fn decomposition(&self) -> PipelineResult<Decomposition>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seasonality {
    Auto,
    On,
    Off,
}

impl Seasonality {
    // "auto" needs at least two full cycles of history
    pub fn enabled(&self, history_span_days: f64, period_days: f64) -> bool {
        match self {
            Seasonality::Auto => history_span_days >= 2.0 * period_days,
            Seasonality::On => true,
            Seasonality::Off => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    #[serde(rename = "weeklySeasonality")]
    pub weekly_seasonality: Seasonality,
    #[serde(rename = "yearlySeasonality")]
    pub yearly_seasonality: Seasonality,
    #[serde(rename = "weeklyFourierOrder")]
    pub weekly_fourier_order: usize,
    #[serde(rename = "yearlyFourierOrder")]
    pub yearly_fourier_order: usize,
    #[serde(rename = "nChangepoints")]
    pub n_changepoints: usize,
    #[serde(rename = "changepointRange")]
    pub changepoint_range: f64,
    #[serde(rename = "changepointPriorScale")]
    pub changepoint_prior_scale: f64,
    #[serde(rename = "seasonalityPriorScale")]
    pub seasonality_prior_scale: f64,
    #[serde(rename = "intervalWidth")]
    pub interval_width: f64,
    // Longest forecast the invoker will build; every frame stays cached
    #[serde(rename = "maxHorizonDays")]
    pub max_horizon_days: i64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            weekly_seasonality: Seasonality::Auto,
            yearly_seasonality: Seasonality::Auto,
            weekly_fourier_order: 3,
            yearly_fourier_order: 10,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            interval_width: 0.8,
            max_horizon_days: 3650,
        }
    }
}
