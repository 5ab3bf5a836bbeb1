use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::api::{CreateBookingParams, OfferParams, SelectDriverParams};
use crate::entities::{Booking, Driver, Offer};
use crate::error::{upstream_error, Error};

/// Bearer-authenticated wrapper over the dispatch REST surface.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub async fn create_booking(&self, params: &CreateBookingParams) -> Result<Booking, Error> {
        self.post("/api/bookings/create", params).await
    }

    pub async fn fetch_offers(&self, booking_id: &Uuid) -> Result<Vec<Offer>, Error> {
        self.get(&format!("/api/bookings/{}/offers", booking_id))
            .await
    }

    pub async fn select_driver(
        &self,
        booking_id: &Uuid,
        driver_id: Uuid,
    ) -> Result<Booking, Error> {
        self.post(
            &format!("/api/bookings/{}/select-driver", booking_id),
            &SelectDriverParams { driver_id },
        )
        .await
    }

    pub async fn submit_offer(
        &self,
        booking_id: &Uuid,
        params: &OfferParams,
    ) -> Result<Offer, Error> {
        self.post(&format!("/api/bookings/{}/offer", booking_id), params)
            .await
    }

    pub async fn available_bookings(&self) -> Result<Vec<Booking>, Error> {
        self.get("/api/bookings/available").await
    }

    pub async fn driver_profile(&self) -> Result<Driver, Error> {
        self.get("/api/drivers/profile").await
    }

    pub async fn cancel_booking(&self, booking_id: &Uuid) -> Result<Booking, Error> {
        self.post(&format!("/api/bookings/{}/cancel", booking_id), &Value::Null)
            .await
    }

    pub async fn complete_booking(&self, booking_id: &Uuid) -> Result<Booking, Error> {
        self.post(
            &format!("/api/bookings/{}/complete", booking_id),
            &Value::Null,
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await?;

        decode(response).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        decode(response).await
    }
}

/// Failed calls surface the server's `error` message when the body carries
/// one, falling back to a generic network error.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| "network error".to_string());

    Err(upstream_error(message))
}
