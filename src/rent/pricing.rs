use chrono::{DateTime, Utc};

use super::models::PriceType;

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Billable units between start and end.
///
/// Minutes are whole (a started minute counts in full), days are fractional.
/// An end before the start bills nothing.
pub fn elapsed_units(price_type: PriceType, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let elapsed_ms = (end - start).num_milliseconds().max(0);
    let seconds = elapsed_ms as f64 / 1000.0;

    match price_type {
        PriceType::Minutes => (seconds / SECONDS_PER_MINUTE).ceil(),
        PriceType::Days => seconds / SECONDS_PER_DAY,
    }
}

/// Final charge for a closed rent
pub fn final_price(
    price_type: PriceType,
    price_of_unit: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> f64 {
    elapsed_units(price_type, start, end) * price_of_unit
}
