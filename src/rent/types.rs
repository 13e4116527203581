use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::models::{PriceType, RentModel};
use crate::transport::models::TransportTypeFilter;

/// `?lat=&long=&radius=&transportType=` for the public transport search;
/// `type=` is accepted as a shorthand
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SearchQuery {
    pub lat: f64,
    pub long: f64,
    pub radius: f64,
    #[serde(rename = "transportType", alias = "type", default)]
    pub transport_type: TransportTypeFilter,
}

/// `?priceType=` when opening a rent
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRentQuery {
    pub price_type: PriceType,
}

/// `?lat=&long=` where the transport is left
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EndRentQuery {
    pub lat: f64,
    pub long: f64,
}

/// Admin payload for creating a rent record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRentRequest {
    pub transport_id: Uuid,
    pub user_id: Uuid,
    pub time_start: DateTime<Utc>,
    #[serde(default)]
    pub time_end: Option<DateTime<Utc>>,
    pub price_of_unit: f64,
    pub price_type: PriceType,
    #[serde(default)]
    pub final_price: Option<f64>,
}

/// Admin partial update.
///
/// For `timeEnd` and `finalPrice` an explicit `null` clears the value,
/// while leaving the key out keeps it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRentUpdateRequest {
    pub transport_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub time_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub time_end: Option<Option<DateTime<Utc>>>,
    pub price_of_unit: Option<f64>,
    pub price_type: Option<PriceType>,
    #[serde(default, deserialize_with = "present")]
    pub final_price: Option<Option<f64>>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RentResponse {
    pub id: Uuid,
    pub transport_id: Uuid,
    pub user_id: Uuid,
    pub time_start: DateTime<Utc>,
    pub time_end: Option<DateTime<Utc>>,
    pub price_of_unit: f64,
    pub price_type: PriceType,
    pub final_price: Option<f64>,
}

impl From<RentModel> for RentResponse {
    fn from(rent: RentModel) -> Self {
        Self {
            id: rent.id,
            transport_id: rent.transport_id,
            user_id: rent.user_id,
            time_start: rent.time_start,
            time_end: rent.time_end,
            price_of_unit: rent.price_of_unit,
            price_type: rent.price_type,
            final_price: rent.final_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_missing() {
        let cleared: AdminRentUpdateRequest =
            serde_json::from_str(r#"{"timeEnd": null, "finalPrice": null}"#).unwrap();
        assert_eq!(cleared.time_end, Some(None));
        assert_eq!(cleared.final_price, Some(None));

        let untouched: AdminRentUpdateRequest =
            serde_json::from_str(r#"{"priceOfUnit": 3.5}"#).unwrap();
        assert_eq!(untouched.time_end, None);
        assert_eq!(untouched.final_price, None);
        assert_eq!(untouched.price_of_unit, Some(3.5));
    }

    #[test]
    fn test_search_query_type_defaults_to_all() {
        let query: SearchQuery =
            serde_json::from_str(r#"{"lat": 1.0, "long": 2.0, "radius": 3.0}"#).unwrap();
        assert_eq!(query.transport_type, TransportTypeFilter::All);
    }

    #[test]
    fn test_search_query_reads_transport_type() {
        let query: SearchQuery = serde_json::from_str(
            r#"{"lat": 1.0, "long": 2.0, "radius": 3.0, "transportType": "Bike"}"#,
        )
        .unwrap();
        assert_eq!(query.transport_type, TransportTypeFilter::Bike);

        let short: SearchQuery = serde_json::from_str(
            r#"{"lat": 1.0, "long": 2.0, "radius": 3.0, "type": "Scooter"}"#,
        )
        .unwrap();
        assert_eq!(short.transport_type, TransportTypeFilter::Scooter);
    }
}
