//! Field validators shared by the saga and the lifecycle operations.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ServiceError;

/// Strict 24-hour `HH:MM:SS`. No normalization: `14:00` and `2pm` are
/// rejected, not repaired.
static TIME_HMS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d):([0-5]\d)$").unwrap());

pub fn validate_time_hms(time: &str) -> Result<(), ServiceError> {
    if TIME_HMS_RE.is_match(time) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTimeFormat(time.to_string()))
    }
}

pub fn parse_service_date(date: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        ServiceError::ValidationError(format!("Date must be yyyy-mm-dd, got {date}"))
    })
}
