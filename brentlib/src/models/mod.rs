pub mod forecast_model;
pub mod additive_model;
pub mod forecast_frame;
pub mod linalg;

pub use forecast_model::*;
pub use additive_model::*;
pub use forecast_frame::*;
