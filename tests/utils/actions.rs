use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a request through the full router and decode the JSON body
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Signs up and returns the access token
    pub async fn sign_up(&self, username: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/Account/SignUp",
                None,
                Some(json!({ "username": username, "password": "password" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "sign up failed: {}", body);

        body["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn me(&self, token: &str) -> Value {
        let (status, body) = self.call("GET", "/api/Account/Me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK, "me failed: {}", body);
        body
    }

    /// Registers a rentable car priced per minute and per day
    pub async fn create_car(&self, token: &str, minute_price: f64, day_price: f64) -> Uuid {
        let (status, body) = self
            .call(
                "POST",
                "/api/Transport",
                Some(token),
                Some(json!({
                    "canBeRented": true,
                    "transportType": "Car",
                    "model": "Granta",
                    "color": "white",
                    "identifier": "E001KX",
                    "latitude": 54.317,
                    "longitude": 48.402,
                    "minutePrice": minute_price,
                    "dayPrice": day_price
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create transport failed: {}", body);

        body["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn start_rent(&self, token: &str, transport_id: Uuid, price_type: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            &format!("/api/Rent/New/{}?priceType={}", transport_id, price_type),
            Some(token),
            None,
        )
        .await
    }

    pub async fn end_rent(&self, token: &str, rent_id: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            &format!("/api/Rent/End/{}?lat=54.33&long=48.41", rent_id),
            Some(token),
            None,
        )
        .await
    }
}
