//! Wire events multiplexed over the booking channel.
//!
//! Frames are JSON, adjacently tagged: `{"event": "...", "data": {...}}`.
//! Event names are shared with the mobile and web clients, so they are part
//! of the protocol and must not drift.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Booking, Offer, Place};

/// Event names, for handler registration on the client side.
pub mod events {
    pub const BOOKING_NEW: &str = "booking:new";
    pub const BOOKING_NEW_OFFER: &str = "booking:newOffer";
    pub const BOOKING_ACCEPTED: &str = "booking:accepted";
    pub const BOOKING_ASSIGNED: &str = "booking:assigned";
    pub const BOOKING_TAKEN: &str = "booking:taken";
    pub const BOOKING_STATUS_UPDATED: &str = "booking:statusUpdated";
    pub const BOOKING_CANCELLED: &str = "booking:cancelled";
    pub const DRIVER_STATUS_UPDATED: &str = "driver:statusUpdated";
    pub const ERROR: &str = "error";

    // synthetic events, emitted locally by the connection manager and never
    // sent over the wire
    pub const CONNECTION_STATUS: &str = "connection:status";
    pub const CONNECTION_FAILED: &str = "connection:failed";
}

/// Server-to-client events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "booking:new")]
    BookingNew { booking: Booking },

    #[serde(rename = "booking:newOffer")]
    NewOffer { offer: Offer },

    #[serde(rename = "booking:accepted")]
    #[serde(rename_all = "camelCase")]
    Accepted { booking_id: Uuid, driver_id: Uuid },

    #[serde(rename = "booking:assigned")]
    Assigned { booking: Booking },

    #[serde(rename = "booking:taken")]
    #[serde(rename_all = "camelCase")]
    Taken { booking_id: Uuid },

    #[serde(rename = "booking:statusUpdated")]
    #[serde(rename_all = "camelCase")]
    StatusUpdated { booking_id: Uuid, status: String },

    #[serde(rename = "booking:cancelled")]
    #[serde(rename_all = "camelCase")]
    Cancelled { booking_id: Uuid },

    #[serde(rename = "driver:statusUpdated")]
    #[serde(rename_all = "camelCase")]
    DriverStatusUpdated { driver_id: Uuid, status: String },

    #[serde(rename = "error")]
    Error { message: String },
}

/// Client-to-server events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "booking:subscribe")]
    #[serde(rename_all = "camelCase")]
    Subscribe { booking_id: Uuid },

    #[serde(rename = "booking:unsubscribe")]
    #[serde(rename_all = "camelCase")]
    Unsubscribe { booking_id: Uuid },

    #[serde(rename = "driver:goOnline")]
    GoOnline,

    #[serde(rename = "driver:goOffline")]
    GoOffline,

    #[serde(rename = "user:requestRide")]
    #[serde(rename_all = "camelCase")]
    RequestRide {
        pickup_location: Place,
        dropoff_location: Place,
        passengers: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_events_carry_their_wire_names() {
        let booking_id = Uuid::new_v4();
        let value = serde_json::to_value(&ServerEvent::Taken { booking_id }).unwrap();

        assert_eq!(value["event"], events::BOOKING_TAKEN);
        assert_eq!(value["data"]["bookingId"], serde_json::json!(booking_id));
    }

    #[test]
    fn client_subscribe_round_trips() {
        let booking_id = Uuid::new_v4();
        let text = serde_json::to_string(&ClientEvent::Subscribe { booking_id }).unwrap();

        match serde_json::from_str::<ClientEvent>(&text).unwrap() {
            ClientEvent::Subscribe { booking_id: id } => assert_eq!(id, booking_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn presence_toggles_have_no_payload() {
        let value = serde_json::to_value(&ClientEvent::GoOnline).unwrap();
        assert_eq!(value["event"], "driver:goOnline");

        let parsed: ClientEvent =
            serde_json::from_str(r#"{"event":"driver:goOffline"}"#).unwrap();
        match parsed {
            ClientEvent::GoOffline => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
