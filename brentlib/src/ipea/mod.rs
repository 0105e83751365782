pub mod objects;
pub use objects::*;

pub mod helpers;

pub mod html;

pub mod fetch_api;
pub use fetch_api::*;
