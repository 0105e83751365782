use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use brentlib::errors::{PipelineError, PipelineResult};
use brentlib::ipea::PageSource;
use brentlib::util::Settings;
use brentlib::{ForecastOutcome, Predictor};

// Serves a fixed page and counts how often it was asked for
struct CountingSource {
    page: Option<String>,
    fetches: AtomicUsize,
}

impl CountingSource {
    fn serving(page: String) -> Arc<Self> {
        Arc::new(CountingSource {
            page: Some(page),
            fetches: AtomicUsize::new(0),
        })
    }

    fn offline() -> Arc<Self> {
        Arc::new(CountingSource {
            page: None,
            fetches: AtomicUsize::new(0),
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for CountingSource {
    fn url(&self) -> &str {
        "test://ipea"
    }

    async fn fetch_page(&self) -> PipelineResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.page {
            Some(page) => Ok(page.clone()),
            None => Err(PipelineError::source_unavailable(self.url(), "connection refused")),
        }
    }
}

// Mimics the IPEA layout: two layout tables, then the series table whose
// first row repeats the column titles
fn ipea_page(rows: &[(String, String)]) -> String {
    let body: String = rows
        .iter()
        .map(|(d, p)| format!("<tr><td class=\"dxgv\">{}</td><td class=\"dxgv\">{}</td></tr>", d, p))
        .collect();
    format!(
        "<html><body>\
         <table><tr><td>ipeadata</td></tr></table>\
         <table><tr><td>Brent</td><td>Frequência: Diária</td></tr></table>\
         <table>\
           <tr><td>Data</td><td>Preço - petróleo bruto - Brent (FOB)</td></tr>\
           {}\
         </table></body></html>",
        body
    )
}

// 2020-01-01 .. 2020-01-10 at 100, 101, ..., 109 US$, encoded x100
fn linear_rows() -> Vec<(String, String)> {
    (0..10)
        .map(|i| {
            let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i);
            (
                date.format("%d/%m/%Y").to_string(),
                format!("{}", (100 + i) * 100),
            )
        })
        .collect()
}

fn predictor(source: Arc<CountingSource>) -> Predictor {
    Predictor::new(source, Settings::default())
}

#[tokio::test]
async fn forecasts_linear_trend_five_days_ahead() {
    let source = CountingSource::serving(ipea_page(&linear_rows()));
    let predictor = predictor(source.clone());

    let prediction = predictor.predict("2020-01-15").await.unwrap();

    assert_eq!(prediction.horizon, 5);
    assert_eq!(prediction.history.len(), 10);
    assert_eq!(prediction.history.rows[0].y, 100.0);
    let value = prediction.value().expect("target date should be in the forecast");
    assert!(value > 110.0 && value < 118.0, "value = {}", value);
    assert!(prediction.message.starts_with("Predicted price for (2020-01-15): US$ "));
    assert_eq!(prediction.frame.len(), 15);
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn date_before_history_is_invalid_request() {
    let source = CountingSource::serving(ipea_page(&linear_rows()));
    let predictor = predictor(source);

    match predictor.predict("2019-01-01").await {
        Err(PipelineError::InvalidRequestDate { last_observed, .. }) => {
            assert_eq!(last_observed, NaiveDate::from_ymd_opt(2020, 1, 10));
        }
        other => panic!("expected InvalidRequestDate, got {:?}", other),
    }
}

#[tokio::test]
async fn last_observed_date_is_invalid_request() {
    let source = CountingSource::serving(ipea_page(&linear_rows()));
    let predictor = predictor(source);

    assert!(matches!(
        predictor.predict("2020-01-10").await,
        Err(PipelineError::InvalidRequestDate { .. })
    ));
}

#[tokio::test]
async fn malformed_request_never_reaches_the_source() {
    let source = CountingSource::serving(ipea_page(&linear_rows()));
    let predictor = predictor(source.clone());

    assert!(predictor.predict("15/01/2020").await.is_err());
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn repeated_date_is_served_from_cache() {
    let source = CountingSource::serving(ipea_page(&linear_rows()));
    let predictor = predictor(source.clone());

    let first = predictor.predict("2020-01-15").await.unwrap();
    let second = predictor.predict("2020-01-15").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(source.fetches(), 1);
    assert_eq!(predictor.cache().len(), 1);

    // a different date is a different key
    predictor.predict("2020-01-20").await.unwrap();
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn concurrent_duplicates_fetch_once_per_date() {
    let source = CountingSource::serving(ipea_page(&linear_rows()));
    let predictor = predictor(source.clone());

    let requests: Vec<String> = ["2020-01-15", "2020-01-12", "2020-01-15", "2020-01-15"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let results = predictor.predict_many(&requests).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn unparseable_date_row_is_excluded_not_fatal() {
    let mut rows = linear_rows();
    rows.insert(4, ("31/13/2020".to_string(), "10350".to_string()));
    let source = CountingSource::serving(ipea_page(&rows));
    let predictor = predictor(source);

    let prediction = predictor.predict("2020-01-15").await.unwrap();

    assert_eq!(prediction.report.rows, 11);
    assert_eq!(prediction.report.invalid_dates, 1);
    assert_eq!(prediction.report.excluded_rows, 1);
    assert_eq!(prediction.history.len(), 10);
    assert_eq!(prediction.history.excluded, 1);
    assert!(matches!(prediction.outcome, ForecastOutcome::Found { .. }));
}

#[tokio::test]
async fn page_without_series_table_is_schema_mismatch() {
    let source = CountingSource::serving(
        "<html><table><tr><td>maintenance</td></tr></table></html>".to_string(),
    );
    let predictor = predictor(source);

    assert!(matches!(
        predictor.predict("2020-01-15").await,
        Err(PipelineError::SchemaMismatch { expected_index: 2, .. })
    ));
}

#[tokio::test]
async fn wrong_date_format_is_data_format_error() {
    let rows: Vec<(String, String)> = linear_rows()
        .into_iter()
        .map(|(d, p)| (d.replace('/', "-"), p))
        .collect();
    let source = CountingSource::serving(ipea_page(&rows));
    let predictor = predictor(source);

    assert!(matches!(
        predictor.predict("2020-01-15").await,
        Err(PipelineError::DataFormat(_))
    ));
}

#[tokio::test]
async fn source_failures_are_not_cached() {
    let source = CountingSource::offline();
    let predictor = predictor(source.clone());

    for _ in 0..2 {
        assert!(matches!(
            predictor.predict("2020-01-15").await,
            Err(PipelineError::SourceUnavailable { .. })
        ));
    }
    assert_eq!(source.fetches(), 2);
    assert!(predictor.cache().is_empty());
}

#[tokio::test]
async fn far_future_date_is_rejected_and_not_cached() {
    let source = CountingSource::serving(ipea_page(&linear_rows()));
    let predictor = predictor(source.clone());

    match predictor.predict("9999-12-31").await {
        Err(PipelineError::InvalidRequestDate { last_observed, .. }) => {
            assert_eq!(last_observed, NaiveDate::from_ymd_opt(2020, 1, 10));
        }
        other => panic!("expected InvalidRequestDate, got {:?}", other),
    }
    assert!(predictor.cache().is_empty());
}

#[tokio::test]
async fn decimal_point_prices_are_data_format_error() {
    let rows: Vec<(String, String)> = (0..10)
        .map(|i| (format!("{:02}/01/2020", i + 1), format!("{}.25", 60 + i)))
        .collect();
    let source = CountingSource::serving(ipea_page(&rows));
    let predictor = predictor(source);

    assert!(matches!(
        predictor.predict("2020-01-15").await,
        Err(PipelineError::DataFormat(_))
    ));
}
