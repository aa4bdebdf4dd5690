use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use shared_models::AppError;

/// Input format accepted for appointment timestamps, e.g. `2025-06-01 14:30`.
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Drop seconds and sub-second precision. Scheduling compares instants at
/// minute granularity only.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Parse a minute-precision timestamp from operator input.
pub fn parse_minute_timestamp(input: &str) -> Result<DateTime<Utc>, AppError> {
    NaiveDateTime::parse_from_str(input.trim(), MINUTE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| AppError::ValidationError(format!("invalid date-time '{}': {}", input, e)))
}
