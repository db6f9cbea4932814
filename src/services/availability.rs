//! Availability gate for the sale saga.
//!
//! Pure functions over [`TourInfo`]: no I/O, no clock. Each failure kind
//! is distinct and stable so callers can map them without string
//! comparison.

use thiserror::Error;

use crate::errors::ServiceError;
use crate::services::ozytrip::types::{Quota, TourDate, TourInfo};

const ADULT_AGE_GROUP: &str = "ADT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityError {
    #[error("Tour has no availability for the requested period")]
    NoAvailability,

    #[error("No availability for the requested date {date}")]
    DateNotAvailable { date: String },

    #[error("No availability at the requested time {time}")]
    TimeNotAvailable { time: String },

    #[error("Insufficient quota: requested {requested}, available {available}")]
    ExceedsAvailableQuota { requested: u32, available: u32 },
}

impl AvailabilityError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoAvailability => "NO_AVAILABILITY",
            Self::DateNotAvailable { .. } => "DATE_NOT_AVAILABLE",
            Self::TimeNotAvailable { .. } => "TIME_NOT_AVAILABLE",
            Self::ExceedsAvailableQuota { .. } => "EXCEEDS_AVAILABLE_QUOTA",
        }
    }
}

impl From<AvailabilityError> for ServiceError {
    fn from(err: AvailabilityError) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

/// Finds the exact date entry for `date` (`YYYY-MM-DD`).
pub fn find_date<'a>(tour: &'a TourInfo, date: &str) -> Result<&'a TourDate, AvailabilityError> {
    if tour.dates.is_empty() {
        return Err(AvailabilityError::NoAvailability);
    }
    tour.dates
        .iter()
        .find(|d| d.date == date)
        .ok_or_else(|| AvailabilityError::DateNotAvailable {
            date: date.to_string(),
        })
}

/// Finds the quota whose start time equals `start_time` (`HH:MM:SS`).
pub fn find_quota<'a>(
    date: &'a TourDate,
    start_time: &str,
) -> Result<&'a Quota, AvailabilityError> {
    date.quotas
        .iter()
        .find(|q| q.start_time == start_time)
        .ok_or_else(|| AvailabilityError::TimeNotAvailable {
            time: start_time.to_string(),
        })
}

/// Number of seats the request actually consumes. When the tour defines
/// per-age-group pricing, only the adult (ADT) group's configured
/// quantity counts toward the total; otherwise the raw pax count is used.
pub fn requested_pax(tour: &TourInfo, qty_pax: u32) -> u32 {
    tour.price_headers
        .iter()
        .flat_map(|header| header.prices.iter())
        .find(|price| price.age_group_code == ADULT_AGE_GROUP)
        .and_then(|price| price.quantity)
        .unwrap_or(qty_pax)
}

/// Verifies the quota can absorb `requested` passengers. A quota flagged
/// unavailable counts as zero seats.
pub fn check_quota(quota: &Quota, requested: u32) -> Result<(), AvailabilityError> {
    let available = if quota.is_available {
        quota.available_quota
    } else {
        0
    };
    if requested > available {
        return Err(AvailabilityError::ExceedsAvailableQuota {
            requested,
            available,
        });
    }
    Ok(())
}

/// Runs the full gate: date, time, and quota. Returns the effective pax
/// count so the caller can build the age-group breakdown from it.
pub fn check_availability(
    tour: &TourInfo,
    date: &str,
    start_time: &str,
    qty_pax: u32,
) -> Result<u32, AvailabilityError> {
    let tour_date = find_date(tour, date)?;
    let quota = find_quota(tour_date, start_time)?;
    let requested = requested_pax(tour, qty_pax);
    check_quota(quota, requested)?;
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ozytrip::types::{Price, PriceHeader};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn tour_with_one_slot() -> TourInfo {
        TourInfo {
            tour_code: "CITYTOUR".into(),
            dates: vec![TourDate {
                date: "2025-05-15".into(),
                quotas: vec![Quota {
                    start_time: "14:00:00".into(),
                    end_time: "17:00:00".into(),
                    available_quota: 2,
                    is_available: true,
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn empty_dates_is_no_availability() {
        let tour = TourInfo::default();
        assert_matches!(
            find_date(&tour, "2025-05-15"),
            Err(AvailabilityError::NoAvailability)
        );
    }

    #[test]
    fn missing_date_is_date_not_available() {
        let tour = tour_with_one_slot();
        let err = check_availability(&tour, "2025-05-16", "14:00:00", 1).unwrap_err();
        assert_eq!(err.code(), "DATE_NOT_AVAILABLE");
    }

    #[test]
    fn missing_time_is_time_not_available() {
        let tour = tour_with_one_slot();
        let err = check_availability(&tour, "2025-05-15", "09:00:00", 1).unwrap_err();
        assert_eq!(err.code(), "TIME_NOT_AVAILABLE");
    }

    #[test]
    fn over_quota_is_exceeds_available_quota() {
        let tour = tour_with_one_slot();
        let err = check_availability(&tour, "2025-05-15", "14:00:00", 3).unwrap_err();
        assert_matches!(
            err,
            AvailabilityError::ExceedsAvailableQuota {
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn exact_quota_fits() {
        let tour = tour_with_one_slot();
        assert_eq!(
            check_availability(&tour, "2025-05-15", "14:00:00", 2).unwrap(),
            2
        );
    }

    #[test]
    fn unavailable_quota_counts_as_zero_seats() {
        let mut tour = tour_with_one_slot();
        tour.dates[0].quotas[0].is_available = false;
        let err = check_availability(&tour, "2025-05-15", "14:00:00", 1).unwrap_err();
        assert_matches!(
            err,
            AvailabilityError::ExceedsAvailableQuota { available: 0, .. }
        );
    }

    #[test]
    fn adt_group_quantity_overrides_raw_pax() {
        let mut tour = tour_with_one_slot();
        tour.price_headers = vec![PriceHeader {
            init_date: "2025-01-01".into(),
            end_date: "2025-12-31".into(),
            prices: vec![Price {
                age_group: "Adult".into(),
                age_group_code: "ADT".into(),
                day_type_description: None,
                unit_price: dec!(25000),
                quantity: Some(1),
            }],
        }];
        assert_eq!(requested_pax(&tour, 4), 1);
    }

    #[test]
    fn raw_pax_used_without_price_schedule() {
        let tour = tour_with_one_slot();
        assert_eq!(requested_pax(&tour, 4), 4);
    }

    #[test]
    fn availability_messages_carry_gate_keywords() {
        // The saga's client-abort policy keys off these words.
        assert!(AvailabilityError::NoAvailability
            .to_string()
            .contains("availability"));
        assert!(AvailabilityError::DateNotAvailable {
            date: "2025-05-16".into()
        }
        .to_string()
        .contains("availability"));
        assert!(AvailabilityError::ExceedsAvailableQuota {
            requested: 3,
            available: 2
        }
        .to_string()
        .contains("quota"));
    }
}
