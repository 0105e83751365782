use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::series::NormalizedSeries;

// Field names follow the forecasting engine's input contract: `ds` timestamp, `y` target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: NaiveDate,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastInput {
    pub rows: Vec<ForecastPoint>,
    pub excluded: usize,
}

impl ForecastInput {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.ds).max()
    }
}

// date -> ds, price -> y. Rows missing either value are left out.
pub fn adapt(series: &NormalizedSeries) -> ForecastInput {
    let rows: Vec<ForecastPoint> = series
        .observations
        .iter()
        .filter_map(|o| match (o.date, o.price) {
            (Some(ds), Some(y)) => Some(ForecastPoint { ds, y }),
            _ => None,
        })
        .collect();
    let excluded = series.observations.len() - rows.len();

    ForecastInput { rows, excluded }
}
