pub mod errors;
pub mod export;
pub mod ipea;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod series;
pub mod util;

pub use errors::{PipelineError, PipelineResult};
pub use pipeline::{ForecastOutcome, Prediction, Predictor};
