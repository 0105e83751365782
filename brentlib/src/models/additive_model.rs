use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

use crate::errors::{PipelineError, PipelineResult};
use crate::models::forecast_frame::{
    DayOfYearEffect, Decomposition, ForecastFrame, ForecastRow, WeekdayEffect,
};
use crate::models::forecast_model::{ForecastModel, ModelConfig};
use crate::models::linalg::{normal_quantile, ridge_least_squares};
use crate::series::ForecastInput;

const WEEKLY_PERIOD: f64 = 7.0;
const YEARLY_PERIOD: f64 = 365.25;
// 1970-01-01 counted from 0001-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
// Keeps the unpenalized trend base numerically positive definite
const BASE_PENALTY: f64 = 1e-8;

// Additive decomposition: y(t) = trend(t) + weekly(t) + yearly(t).
// The trend is piecewise linear with slope changes at fixed changepoints,
// seasonalities are Fourier series. All coefficients come from a single
// ridge regression where changepoint and seasonal terms are shrunk.
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    config: ModelConfig,
    fitted: Option<FittedParams>,
}

#[derive(Debug, Clone)]
struct FittedParams {
    start: NaiveDate,
    end: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    weekly_order: usize,
    yearly_order: usize,
    beta: Vec<f64>,
    sigma: f64,
    history: Vec<NaiveDate>,
}

struct Components {
    trend: f64,
    weekly: f64,
    yearly: f64,
}

impl FittedParams {
    fn scaled_time(&self, ds: NaiveDate) -> f64 {
        (ds - self.start).num_days() as f64 / self.span_days
    }

    fn features(&self, ds: NaiveDate) -> Vec<f64> {
        let t = self.scaled_time(ds);
        let mut row = Vec::with_capacity(self.beta.len().max(2));
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));

        let days = (ds.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE) as f64;
        fourier_terms(days, WEEKLY_PERIOD, self.weekly_order, &mut row);
        fourier_terms(days, YEARLY_PERIOD, self.yearly_order, &mut row);
        row
    }

    fn components(&self, ds: NaiveDate) -> Components {
        let row = self.features(ds);
        let trend_end = 2 + self.changepoints.len();
        let weekly_end = trend_end + 2 * self.weekly_order;

        let dot = |range: std::ops::Range<usize>| -> f64 {
            range.map(|i| row[i] * self.beta[i]).sum::<f64>() * self.y_scale
        };

        Components {
            trend: dot(0..trend_end),
            weekly: dot(trend_end..weekly_end),
            yearly: dot(weekly_end..row.len()),
        }
    }
}

fn fourier_terms(days: f64, period: f64, order: usize, out: &mut Vec<f64>) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * days / period;
        out.push(angle.sin());
        out.push(angle.cos());
    }
}

impl AdditiveModel {
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn seasonalities(&self) -> (bool, bool) {
        self.fitted
            .as_ref()
            .map_or((false, false), |p| (p.weekly_order > 0, p.yearly_order > 0))
    }

    fn params(&self) -> PipelineResult<&FittedParams> {
        self.fitted
            .as_ref()
            .ok_or_else(|| PipelineError::Model("model has not been fitted".to_string()))
    }
}

impl ForecastModel for AdditiveModel {
    fn from_config(config: &ModelConfig) -> Self {
        AdditiveModel {
            config: config.clone(),
            fitted: None,
        }
    }

    fn fit(&mut self, input: &ForecastInput) -> PipelineResult<()> {
        let mut rows = input.rows.clone();
        rows.sort_by_key(|r| r.ds);

        let n = rows.len();
        if n < 2 {
            return Err(PipelineError::Model(format!(
                "need at least 2 observations to fit, got {}",
                n
            )));
        }

        let start = rows[0].ds;
        let end = rows[n - 1].ds;
        let span_days = (end - start).num_days() as f64;
        if span_days <= 0.0 {
            return Err(PipelineError::Model(
                "history covers a single day".to_string(),
            ));
        }

        let y_scale = match rows.iter().map(|r| r.y.abs()).fold(0.0, f64::max) {
            m if m > 0.0 => m,
            _ => 1.0,
        };

        let t: Vec<f64> = rows
            .iter()
            .map(|r| (r.ds - start).num_days() as f64 / span_days)
            .collect();

        // Changepoints sit on observed dates, evenly spread over the first part of history
        let hist_size = (n as f64 * self.config.changepoint_range).floor() as usize;
        let count = self.config.n_changepoints.min(hist_size.saturating_sub(1));
        let mut changepoints: Vec<f64> = (1..=count)
            .map(|j| {
                let idx = (j as f64 * (hist_size - 1) as f64 / count as f64).round() as usize;
                t[idx]
            })
            .collect();
        changepoints.dedup();

        let weekly_order = if self.config.weekly_seasonality.enabled(span_days, WEEKLY_PERIOD) {
            self.config.weekly_fourier_order
        } else {
            0
        };
        let yearly_order = if self.config.yearly_seasonality.enabled(span_days, YEARLY_PERIOD) {
            self.config.yearly_fourier_order
        } else {
            0
        };

        let mut params = FittedParams {
            start,
            end,
            span_days,
            y_scale,
            changepoints,
            weekly_order,
            yearly_order,
            beta: Vec::new(),
            sigma: 0.0,
            history: Vec::new(),
        };

        let design: Vec<Vec<f64>> = rows.iter().map(|r| params.features(r.ds)).collect();
        let targets: Vec<f64> = rows.iter().map(|r| r.y / y_scale).collect();

        let changepoint_penalty = 1.0 / self.config.changepoint_prior_scale.max(1e-6);
        let seasonal_penalty = 1.0 / self.config.seasonality_prior_scale.max(1e-6);
        let mut penalties = vec![BASE_PENALTY, BASE_PENALTY];
        penalties.extend(std::iter::repeat(changepoint_penalty).take(params.changepoints.len()));
        penalties.extend(std::iter::repeat(seasonal_penalty).take(2 * (weekly_order + yearly_order)));

        let beta = ridge_least_squares(&design, &targets, &penalties).ok_or_else(|| {
            PipelineError::Model("normal equations are singular".to_string())
        })?;

        let sse: f64 = design
            .iter()
            .zip(&targets)
            .map(|(row, y)| {
                let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
                (y - fitted).powi(2)
            })
            .sum();

        params.beta = beta;
        params.sigma = (sse / n as f64).sqrt();
        params.history = rows.iter().map(|r| r.ds).collect();
        params.history.dedup();

        log::info!(
            "Fitted additive model on {} rows from {} to {} ({} changepoints, weekly={}, yearly={})",
            n,
            start,
            end,
            params.changepoints.len(),
            weekly_order > 0,
            yearly_order > 0
        );

        self.fitted = Some(params);
        Ok(())
    }

    fn make_future_dates(&self, periods: i64) -> PipelineResult<Vec<NaiveDate>> {
        let params = self.params()?;
        let mut dates = params.history.clone();
        dates.extend((1..=periods).map(|d| params.end + chrono::Duration::days(d)));
        Ok(dates)
    }

    fn predict(&self, dates: &[NaiveDate]) -> PipelineResult<ForecastFrame> {
        let params = self.params()?;
        let z = normal_quantile((1.0 + self.config.interval_width) / 2.0);
        let sigma = params.sigma * params.y_scale;

        let rows = dates
            .iter()
            .map(|&ds| {
                let c = params.components(ds);
                let yhat = c.trend + c.weekly + c.yearly;

                // Uncertainty grows with distance past the last observation
                let ahead = (ds - params.end).num_days().max(0) as f64;
                let half_width = z * sigma * (1.0 + ahead / params.span_days).sqrt();

                ForecastRow {
                    ds,
                    trend: c.trend,
                    weekly: c.weekly,
                    yearly: c.yearly,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                }
            })
            .collect();

        Ok(ForecastFrame { rows })
    }

    fn decomposition(&self) -> PipelineResult<Decomposition> {
        let params = self.params()?;
        let mut decomposition = Decomposition::default();

        if params.weekly_order > 0 {
            // 2018-01-01 is a Monday
            if let Some(monday) = NaiveDate::from_ymd_opt(2018, 1, 1) {
                decomposition.weekly = (0..7)
                    .map(|i| {
                        let ds = monday + chrono::Duration::days(i);
                        WeekdayEffect {
                            weekday: ds.weekday(),
                            effect: params.components(ds).weekly,
                        }
                    })
                    .collect();
            }
        }

        if params.yearly_order > 0 {
            if let Some(first) = NaiveDate::from_ymd_opt(2017, 1, 1) {
                decomposition.yearly = (0..365)
                    .map(|i| {
                        let ds = first + chrono::Duration::days(i);
                        DayOfYearEffect {
                            day_of_year: ds.ordinal(),
                            effect: params.components(ds).yearly,
                        }
                    })
                    .collect();
            }
        }

        Ok(decomposition)
    }
}
