mod booking_api;
mod driver_api;
mod events;
mod session_api;
mod sessions;
mod topics;

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::api::API;
use crate::auth::User;
use crate::entities::{Booking, Driver, OfferBoard};
use crate::engine::sessions::SessionRegistry;
use crate::engine::topics::TopicRegistry;

/// The authoritative dispatch coordinator.
///
/// Owns the canonical booking, offer and presence records; connected clients
/// only ever hold projections received over the channel, reconciled by REST
/// reads. Every booking mutation happens under the bookings write lock, so a
/// booking is a unit of mutual exclusion and racing selections serialize.
///
/// Lock order, where more than one is held: bookings, drivers, offers.
pub struct Engine {
    bookings: RwLock<HashMap<Uuid, Booking>>,
    drivers: RwLock<HashMap<Uuid, Driver>>,
    offers: RwLock<HashMap<Uuid, OfferBoard>>,
    tokens: RwLock<HashMap<String, User>>,
    sessions: SessionRegistry,
    topics: TopicRegistry,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new")]
    pub fn new() -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
            drivers: RwLock::new(HashMap::new()),
            offers: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            sessions: SessionRegistry::new(),
            topics: TopicRegistry::new(),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl API for Engine {}
