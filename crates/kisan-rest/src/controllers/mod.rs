//! REST API controllers.

pub mod health_controller;
pub mod location_controller;
pub mod metrics_controller;
pub mod weather_controller;

pub use health_controller::*;
