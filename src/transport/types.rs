use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{TransportModel, TransportType, TransportTypeFilter};

/// Full transport description sent on create and update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRequest {
    pub can_be_rented: bool,
    pub transport_type: TransportType,
    pub model: String,
    pub color: String,
    pub identifier: String,
    #[serde(default)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub minute_price: Option<f64>,
    #[serde(default)]
    pub day_price: Option<f64>,
}

/// Admin variant that names the owner explicitly
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTransportRequest {
    pub owner_id: Uuid,
    #[serde(flatten)]
    pub transport: TransportRequest,
}

/// `?transportType=` on list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportListQuery {
    #[serde(default)]
    pub transport_type: TransportTypeFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransportResponse {
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

impl From<TransportModel> for TransportResponse {
    fn from(transport: TransportModel) -> Self {
        Self {
            id: transport.id,
            owner_id: transport.owner_id,
            can_be_rented: transport.can_be_rented,
            transport_type: transport.transport_type,
            model: transport.model,
            color: transport.color,
            identifier: transport.identifier,
            description: transport.description,
            latitude: transport.latitude,
            longitude: transport.longitude,
            minute_price: transport.minute_price,
            day_price: transport.day_price,
            created_at: transport.created_at,
            updated_at: transport.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_request_flattens_transport() {
        let owner_id = Uuid::new_v4();
        let json = format!(
            r#"{{
                "ownerId": "{}",
                "canBeRented": true,
                "transportType": "Scooter",
                "model": "Ninebot",
                "color": "black",
                "identifier": "S-17",
                "latitude": 54.3,
                "longitude": 48.4,
                "minutePrice": 7.5
            }}"#,
            owner_id
        );

        let request: AdminTransportRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.owner_id, owner_id);
        assert_eq!(request.transport.transport_type, TransportType::Scooter);
        assert_eq!(request.transport.minute_price, Some(7.5));
        assert_eq!(request.transport.day_price, None);
        assert_eq!(request.transport.description, None);
    }

    #[test]
    fn test_unknown_transport_type_rejected() {
        let json = r#"{
            "canBeRented": true,
            "transportType": "Tank",
            "model": "T-34",
            "color": "green",
            "identifier": "X",
            "latitude": 0.0,
            "longitude": 0.0
        }"#;

        assert!(serde_json::from_str::<TransportRequest>(json).is_err());
    }
}
