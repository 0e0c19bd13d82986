use chrono::{DateTime, Utc};
use thiserror::Error;

pub const PRICING_HOURLY: &str = "HOURLY";
pub const PRICING_DAILY: &str = "DAILY";
pub const PRICING_FIXED: &str = "FIXED";

#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("Booking window must end after it starts")]
    EmptyWindow,

    #[error("Hourly bookings must span a whole number of hours")]
    PartialHour,

    #[error("Deposit percent must be between 1 and 100")]
    InvalidDepositPercent,

    #[error("{0} is not a valid pricing type")]
    UnknownPricingType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub amount: f32,
    pub deposit_amount: Option<f32>,
    pub remaining_amount: Option<f32>,
}

/// Price a booking window against a service.
///
/// HOURLY multiplies the unit price by the whole hours in the window,
/// DAILY by the calendar day span (start day inclusive, so a same-day
/// booking counts as one day), FIXED charges the unit price as-is. When
/// the service carries a deposit percent the amount is split into a
/// deposit and a remaining balance that always sum back to the amount.
pub fn quote(
    pricing_type: &str,
    unit_price: f32,
    deposit_percent: Option<i32>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<Quote, QuoteError> {
    let amount = match pricing_type {
        PRICING_HOURLY => {
            let minutes = (ends_at - starts_at).num_minutes();
            if minutes <= 0 {
                return Err(QuoteError::EmptyWindow);
            }
            if minutes % 60 != 0 {
                return Err(QuoteError::PartialHour);
            }
            unit_price * (minutes / 60) as f32
        }
        PRICING_DAILY => {
            if ends_at < starts_at {
                return Err(QuoteError::EmptyWindow);
            }
            let days = (ends_at.date_naive() - starts_at.date_naive()).num_days() + 1;
            unit_price * days as f32
        }
        PRICING_FIXED => {
            if ends_at < starts_at {
                return Err(QuoteError::EmptyWindow);
            }
            unit_price
        }
        other => return Err(QuoteError::UnknownPricingType(other.to_string())),
    };

    let (deposit_amount, remaining_amount) = match deposit_percent {
        Some(percent) => {
            if !(1..=100).contains(&percent) {
                return Err(QuoteError::InvalidDepositPercent);
            }
            let deposit = round_cents(amount * percent as f32 / 100.0);
            (Some(deposit), Some(round_cents(amount - deposit)))
        }
        None => (None, None),
    };

    Ok(Quote {
        amount: round_cents(amount),
        deposit_amount,
        remaining_amount,
    })
}

fn round_cents(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn hourly_multiplies_whole_hours() {
        let quote = quote(PRICING_HOURLY, 40.0, None, at(10, 9, 0), at(10, 12, 0)).unwrap();
        assert_eq!(quote.amount, 120.0);
        assert_eq!(quote.deposit_amount, None);
    }

    #[test]
    fn hourly_rejects_partial_hours() {
        let err = quote(PRICING_HOURLY, 40.0, None, at(10, 9, 0), at(10, 10, 30)).unwrap_err();
        assert_eq!(err, QuoteError::PartialHour);
    }

    #[test]
    fn hourly_rejects_empty_window() {
        let err = quote(PRICING_HOURLY, 40.0, None, at(10, 9, 0), at(10, 9, 0)).unwrap_err();
        assert_eq!(err, QuoteError::EmptyWindow);
    }

    #[test]
    fn daily_counts_calendar_days_inclusive() {
        let quote = quote(PRICING_DAILY, 150.0, None, at(10, 14, 0), at(12, 10, 0)).unwrap();
        assert_eq!(quote.amount, 450.0);
    }

    #[test]
    fn daily_same_day_is_one_day() {
        let quote = quote(PRICING_DAILY, 150.0, None, at(10, 9, 0), at(10, 18, 0)).unwrap();
        assert_eq!(quote.amount, 150.0);
    }

    #[test]
    fn fixed_charges_unit_price() {
        let quote = quote(PRICING_FIXED, 99.5, None, at(10, 9, 0), at(10, 11, 0)).unwrap();
        assert_eq!(quote.amount, 99.5);
    }

    #[test]
    fn deposit_splits_and_sums_back() {
        let quote = quote(PRICING_FIXED, 200.0, Some(30), at(10, 9, 0), at(10, 11, 0)).unwrap();
        assert_eq!(quote.deposit_amount, Some(60.0));
        assert_eq!(quote.remaining_amount, Some(140.0));
        assert_eq!(
            quote.deposit_amount.unwrap() + quote.remaining_amount.unwrap(),
            quote.amount
        );
    }

    #[test]
    fn deposit_rounds_to_cents() {
        let quote = quote(PRICING_FIXED, 99.99, Some(33), at(10, 9, 0), at(10, 11, 0)).unwrap();
        assert_eq!(quote.deposit_amount, Some(33.0));
        assert_eq!(quote.remaining_amount, Some(66.99));
    }

    #[test]
    fn rejects_out_of_range_deposit_percent() {
        let err = quote(PRICING_FIXED, 100.0, Some(0), at(10, 9, 0), at(10, 11, 0)).unwrap_err();
        assert_eq!(err, QuoteError::InvalidDepositPercent);
        let err = quote(PRICING_FIXED, 100.0, Some(101), at(10, 9, 0), at(10, 11, 0)).unwrap_err();
        assert_eq!(err, QuoteError::InvalidDepositPercent);
    }

    #[test]
    fn rejects_unknown_pricing_type() {
        let err = quote("WEEKLY", 100.0, None, at(10, 9, 0), at(10, 11, 0)).unwrap_err();
        assert_eq!(err, QuoteError::UnknownPricingType("WEEKLY".to_string()));
    }
}
