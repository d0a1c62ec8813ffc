//! Tier1 Analytics - Backend Library
//!
//! Usage KPIs and raw data browsing for the Tier1 dashboard.

#[macro_use]
mod macros;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
