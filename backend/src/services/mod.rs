//! Business logic services.

pub mod auth_service;
pub mod metrics_service;
pub mod report_window;
pub mod usage_data_service;
pub mod usage_metrics_service;
