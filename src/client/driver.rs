use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::api::OfferParams;
use crate::client::connection::{ChannelClient, Subscription};
use crate::client::rest::RestClient;
use crate::entities::{Booking, Offer};
use crate::error::{not_connected_error, Error};
use crate::protocol::{events, ClientEvent};

/// A driver's view of the dispatch stream: the pending-booking list fed by
/// broadcasts, the echoed presence status, and the active ride once assigned.
pub struct DriverSession {
    rest: RestClient,
    channel: ChannelClient,
    pending: Arc<Mutex<Vec<Booking>>>,
    presence: Arc<Mutex<String>>,
    active: Arc<Mutex<Option<Booking>>>,
    subscriptions: Vec<Subscription>,
}

impl DriverSession {
    pub fn start(rest: RestClient, channel: ChannelClient) -> Self {
        let pending: Arc<Mutex<Vec<Booking>>> = Arc::new(Mutex::new(Vec::new()));
        let presence = Arc::new(Mutex::new("offline".to_string()));
        let active: Arc<Mutex<Option<Booking>>> = Arc::new(Mutex::new(None));

        let mut subscriptions = Vec::new();

        {
            let pending = pending.clone();
            subscriptions.push(channel.on(events::BOOKING_NEW, move |data| {
                if let Ok(booking) = serde_json::from_value::<Booking>(data["booking"].clone()) {
                    let mut pending = pending.lock().unwrap();
                    if !pending.iter().any(|existing| existing.id == booking.id) {
                        pending.push(booking);
                    }
                }
            }));
        }

        {
            let pending = pending.clone();
            subscriptions.push(channel.on(events::BOOKING_TAKEN, move |data| {
                if let Some(booking_id) = parse_booking_id(data) {
                    pending.lock().unwrap().retain(|b| b.id != booking_id);
                }
            }));
        }

        {
            let pending = pending.clone();
            let active = active.clone();
            subscriptions.push(channel.on(events::BOOKING_CANCELLED, move |data| {
                if let Some(booking_id) = parse_booking_id(data) {
                    pending.lock().unwrap().retain(|b| b.id != booking_id);

                    let mut active = active.lock().unwrap();
                    if active.as_ref().map(|b| b.id) == Some(booking_id) {
                        *active = None;
                    }
                }
            }));
        }

        {
            let pending = pending.clone();
            let active = active.clone();
            subscriptions.push(channel.on(events::BOOKING_ASSIGNED, move |data| {
                if let Ok(booking) = serde_json::from_value::<Booking>(data["booking"].clone()) {
                    pending.lock().unwrap().retain(|b| b.id != booking.id);
                    *active.lock().unwrap() = Some(booking);
                }
            }));
        }

        {
            let presence = presence.clone();
            subscriptions.push(channel.on(events::DRIVER_STATUS_UPDATED, move |data| {
                if let Some(status) = data["status"].as_str() {
                    *presence.lock().unwrap() = status.to_string();
                }
            }));
        }

        Self {
            rest,
            channel,
            pending,
            presence,
            active,
            subscriptions,
        }
    }

    /// Toggles presence. Refused outright when the channel is down, the
    /// intent is never queued. The local status only changes once the server
    /// echoes `driver:statusUpdated`.
    pub fn set_online(&self, online: bool) -> Result<(), Error> {
        if !self.channel.is_connected() {
            return Err(not_connected_error());
        }

        let event = if online {
            ClientEvent::GoOnline
        } else {
            ClientEvent::GoOffline
        };

        if !self.channel.send(&event) {
            return Err(not_connected_error());
        }

        Ok(())
    }

    pub async fn submit_offer(
        &self,
        booking_id: &Uuid,
        params: &OfferParams,
    ) -> Result<Offer, Error> {
        self.rest.submit_offer(booking_id, params).await
    }

    pub async fn available_bookings(&self) -> Result<Vec<Booking>, Error> {
        self.rest.available_bookings().await
    }

    pub async fn complete_ride(&self, booking_id: &Uuid) -> Result<Booking, Error> {
        self.rest.complete_booking(booking_id).await
    }

    pub fn pending(&self) -> Vec<Booking> {
        self.pending.lock().unwrap().clone()
    }

    /// Last presence status echoed by the server.
    pub fn presence(&self) -> String {
        self.presence.lock().unwrap().clone()
    }

    pub fn active_ride(&self) -> Option<Booking> {
        self.active.lock().unwrap().clone()
    }

    pub fn stop(self) {
        for subscription in &self.subscriptions {
            subscription.cancel();
        }
    }
}

fn parse_booking_id(data: &serde_json::Value) -> Option<Uuid> {
    data["bookingId"]
        .as_str()
        .and_then(|raw| raw.parse().ok())
}
