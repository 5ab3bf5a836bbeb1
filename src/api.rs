use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{Booking, Driver, Offer, Place};
use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateBookingParams {
    pub pickup: Place,
    pub dropoff: Place,
    pub passengers: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfferParams {
    pub driver_name: String,
    pub rating: f64,
    pub vehicle: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectDriverParams {
    pub driver_id: Uuid,
}

#[async_trait]
pub trait BookingAPI {
    async fn create_booking(&self, user: User, params: CreateBookingParams)
        -> Result<Booking, Error>;

    async fn find_booking(&self, user: User, id: Uuid) -> Result<Booking, Error>;

    async fn available_bookings(&self, user: User) -> Result<Vec<Booking>, Error>;

    async fn list_offers(&self, user: User, id: Uuid) -> Result<Vec<Offer>, Error>;

    async fn submit_offer(&self, user: User, id: Uuid, params: OfferParams)
        -> Result<Offer, Error>;

    async fn select_driver(&self, user: User, id: Uuid, driver_id: Uuid)
        -> Result<Booking, Error>;

    async fn cancel_booking(&self, user: User, id: Uuid) -> Result<Booking, Error>;

    async fn complete_booking(&self, user: User, id: Uuid) -> Result<Booking, Error>;
}

#[async_trait]
pub trait DriverAPI {
    async fn driver_profile(&self, user: User) -> Result<Driver, Error>;

    async fn set_driver_status(&self, user: User, online: bool) -> Result<Driver, Error>;
}

#[async_trait]
pub trait SessionAPI {
    async fn issue_token(&self, user: User) -> Result<String, Error>;

    async fn authenticate(&self, token: &str) -> Result<User, Error>;
}

pub trait API: BookingAPI + DriverAPI + SessionAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
