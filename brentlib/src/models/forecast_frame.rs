use chrono::{NaiveDate, Weekday};
use serde::Serialize;

// One row per date: the history range followed by the requested horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub trend: f64,
    pub weekly: f64,
    pub yearly: f64,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastFrame {
    pub rows: Vec<ForecastRow>,
}

impl ForecastFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    // Exact date match only, no nearest-date fallback
    pub fn lookup(&self, date: NaiveDate) -> Option<&ForecastRow> {
        self.rows.iter().find(|row| row.ds == date)
    }

    pub fn last(&self) -> Option<&ForecastRow> {
        self.rows.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayEffect {
    pub weekday: Weekday,
    pub effect: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOfYearEffect {
    pub day_of_year: u32,
    pub effect: f64,
}

// Seasonal components evaluated over one full cycle each, in price units.
// Empty when the corresponding seasonality was not fitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Decomposition {
    pub weekly: Vec<WeekdayEffect>,
    pub yearly: Vec<DayOfYearEffect>,
}
