use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use strum_macros::EnumIter;
use uuid::Uuid;

/// Billing unit of a rent; stored as the `price_type` Postgres enum
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, sqlx::Type,
)]
#[sqlx(type_name = "price_type")]
pub enum PriceType {
    Minutes,
    Days,
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PriceType::Minutes => write!(f, "Minutes"),
            PriceType::Days => write!(f, "Days"),
        }
    }
}

/// Database model for rents table
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct RentModel {
    pub id: Uuid,
    pub transport_id: Uuid,
    pub user_id: Uuid,
    pub time_start: DateTime<Utc>,
    pub time_end: Option<DateTime<Utc>>, // None while the rent is open
    pub price_of_unit: f64,
    pub price_type: PriceType,
    pub final_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentModel {
    /// Creates an open rent with the unit price frozen at `time_start`.
    /// The row is stamped with `time_start` too.
    pub fn open(
        transport_id: Uuid,
        user_id: Uuid,
        time_start: DateTime<Utc>,
        price_of_unit: f64,
        price_type: PriceType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport_id,
            user_id,
            time_start,
            time_end: None,
            price_of_unit,
            price_type,
            final_price: None,
            created_at: time_start,
            updated_at: time_start,
        }
    }

    pub fn is_open(&self) -> bool {
        self.time_end.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rent() {
        let start = Utc::now();
        let rent = RentModel::open(Uuid::new_v4(), Uuid::new_v4(), start, 2.5, PriceType::Days);

        assert!(rent.is_open());
        assert_eq!(rent.time_start, start);
        assert_eq!(rent.created_at, start);
        assert_eq!(rent.updated_at, start);
        assert_eq!(rent.final_price, None);
    }

    #[test]
    fn test_price_type_wire_names() {
        assert_eq!(serde_json::to_string(&PriceType::Minutes).unwrap(), "\"Minutes\"");
        let parsed: PriceType = serde_json::from_str("\"Days\"").unwrap();
        assert_eq!(parsed, PriceType::Days);
        assert!(serde_json::from_str::<PriceType>("\"Hours\"").is_err());
    }
}
