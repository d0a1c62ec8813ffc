//! Shared query parameters and validation for API handlers.
//!
//! Numeric parameters are taken as signed integers so out-of-range values
//! (negative offsets, zero days) reach validation and get a precise 400
//! message instead of a generic deserialization rejection.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, Result};

/// Longest reporting window accepted, in days.
pub const MAX_DAYS: i64 = 365;

/// `?days=` for time-series endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DaysQuery {
    /// Window length in days (1-365)
    pub days: Option<i64>,
}

impl DaysQuery {
    pub fn days_or(&self, default: u32) -> Result<u32> {
        validate_days(self.days.unwrap_or(default as i64))
    }
}

/// `?days=&limit=` for ranked lists.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RankingQuery {
    /// Window length in days (1-365)
    pub days: Option<i64>,
    /// Number of entries to return
    pub limit: Option<i64>,
}

/// `?limit=&offset=` for paged lists.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page size
    pub limit: Option<i64>,
    /// Rows to skip (>= 0)
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Validated `(limit, offset)` with the given default and maximum page size.
    pub fn resolve(&self, default_limit: i64, max_limit: i64) -> Result<(i64, i64)> {
        let limit = validate_limit(self.limit.unwrap_or(default_limit), max_limit)?;
        let offset = validate_offset(self.offset.unwrap_or(0))?;
        Ok((limit, offset))
    }
}

pub fn validate_days(days: i64) -> Result<u32> {
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(AppError::Validation(format!(
            "Days must be between 1 and {}",
            MAX_DAYS
        )));
    }
    Ok(days as u32)
}

pub fn validate_limit(limit: i64, max: i64) -> Result<i64> {
    if !(1..=max).contains(&limit) {
        return Err(AppError::Validation(format!(
            "Limit must be between 1 and {}",
            max
        )));
    }
    Ok(limit)
}

pub fn validate_offset(offset: i64) -> Result<i64> {
    if offset < 0 {
        return Err(AppError::Validation("Offset must be >= 0".to_string()));
    }
    Ok(offset)
}

/// `{ "success": true }`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
