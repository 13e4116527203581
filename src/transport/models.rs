use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use strum_macros::EnumIter;
use uuid::Uuid;

/// Kind of vehicle; stored as the `transport_type` Postgres enum
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, sqlx::Type,
)]
#[sqlx(type_name = "transport_type")]
pub enum TransportType {
    Car,
    Bike,
    Scooter,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TransportType::Car => "Car",
            TransportType::Bike => "Bike",
            TransportType::Scooter => "Scooter",
        };
        write!(f, "{}", name)
    }
}

/// `transportType` query value; `All` disables the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, EnumIter)]
pub enum TransportTypeFilter {
    #[default]
    All,
    Car,
    Bike,
    Scooter,
}

impl TransportTypeFilter {
    pub fn transport_type(self) -> Option<TransportType> {
        match self {
            TransportTypeFilter::All => None,
            TransportTypeFilter::Car => Some(TransportType::Car),
            TransportTypeFilter::Bike => Some(TransportType::Bike),
            TransportTypeFilter::Scooter => Some(TransportType::Scooter),
        }
    }
}

/// Database model for transports table
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct TransportModel {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub can_be_rented: bool,
    pub transport_type: TransportType,
    pub model: String,
    pub color: String,
    pub identifier: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub minute_price: Option<f64>,
    pub day_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransportModel {
    /// Rentable transport at (0, 0) with no prices set
    pub fn new(
        owner_id: Uuid,
        transport_type: TransportType,
        model: &str,
        color: &str,
        identifier: &str,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            owner_id,
            can_be_rented: true,
            transport_type,
            model: model.to_string(),
            color: color.to_string(),
            identifier: identifier.to_string(),
            description: None,
            latitude: 0.0,
            longitude: 0.0,
            minute_price: None,
            day_price: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Euclidean distance in degree space
    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        (self.latitude - latitude).hypot(self.longitude - longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_filter_maps_every_type() {
        let mapped: Vec<TransportType> = TransportTypeFilter::iter()
            .filter_map(TransportTypeFilter::transport_type)
            .collect();

        assert_eq!(mapped, TransportType::iter().collect::<Vec<_>>());
        assert_eq!(TransportTypeFilter::default().transport_type(), None);
    }

    #[test]
    fn test_transport_type_serializes_as_name() {
        for transport_type in TransportType::iter() {
            let json = serde_json::to_string(&transport_type).unwrap();
            assert_eq!(json, format!("\"{}\"", transport_type));
        }
    }

    #[test]
    fn test_distance_to() {
        let mut transport = TransportModel::new(Uuid::new_v4(), TransportType::Car, "m", "c", "i");
        transport.latitude = 3.0;
        transport.longitude = 4.0;

        assert_eq!(transport.distance_to(0.0, 0.0), 5.0);
        assert_eq!(transport.distance_to(3.0, 4.0), 0.0);
    }
}
