use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use crate::client::connection::{ChannelClient, Subscription};
use crate::client::rest::RestClient;
use crate::entities::{Booking, Offer, OfferBoard};
use crate::error::{invalid_state_error, not_connected_error, Error};
use crate::protocol::{events, ClientEvent};

/// Selection lifecycle for one watched booking. The tagged states are what
/// enforce selection mutual exclusion: while a request is `Pending`, a second
/// `select` is refused before anything is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Idle,
    Pending { driver_id: Uuid },
    Confirmed { driver_id: Uuid },
}

impl Selection {
    fn try_begin(&mut self, driver_id: Uuid) -> Result<(), Error> {
        match self {
            Selection::Idle => {
                *self = Selection::Pending { driver_id };
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    fn confirm(&mut self) {
        if let Selection::Pending { driver_id } = self {
            *self = Selection::Confirmed {
                driver_id: *driver_id,
            };
        }
    }

    fn reset(&mut self) {
        if let Selection::Pending { driver_id: _ } = self {
            *self = Selection::Idle;
        }
    }
}

/// A rider watching one booking's offer stream.
///
/// Watching subscribes to the booking topic and then reconciles with a REST
/// read, since channel events emitted before the subscription are never
/// replayed. The local offer board is a projection: it holds exactly the
/// offers seen since watching began.
pub struct RiderSession {
    rest: RestClient,
    channel: ChannelClient,
    booking_id: Uuid,
    board: Arc<Mutex<OfferBoard>>,
    selection: Arc<Mutex<Selection>>,
    last_status: Arc<Mutex<Option<String>>>,
    subscriptions: Vec<Subscription>,
}

impl std::fmt::Debug for RiderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiderSession")
            .field("booking_id", &self.booking_id)
            .finish_non_exhaustive()
    }
}

impl RiderSession {
    pub async fn watch(
        rest: RestClient,
        channel: ChannelClient,
        booking_id: Uuid,
    ) -> Result<Self, Error> {
        let board = Arc::new(Mutex::new(OfferBoard::new()));
        let selection = Arc::new(Mutex::new(Selection::Idle));
        let last_status = Arc::new(Mutex::new(None));

        let mut subscriptions = Vec::new();

        {
            let board = board.clone();
            subscriptions.push(channel.on(events::BOOKING_NEW_OFFER, move |data| {
                if let Ok(offer) = serde_json::from_value::<Offer>(data["offer"].clone()) {
                    if offer.booking_id == booking_id {
                        board.lock().unwrap().upsert(offer);
                    }
                }
            }));
        }

        {
            let board = board.clone();
            let last_status = last_status.clone();
            subscriptions.push(channel.on(events::BOOKING_CANCELLED, move |data| {
                if data["bookingId"] == serde_json::json!(booking_id) {
                    board.lock().unwrap().clear();
                    *last_status.lock().unwrap() = Some("cancelled".to_string());
                }
            }));
        }

        {
            let last_status = last_status.clone();
            subscriptions.push(channel.on(events::BOOKING_STATUS_UPDATED, move |data| {
                if data["bookingId"] == serde_json::json!(booking_id) {
                    if let Some(status) = data["status"].as_str() {
                        *last_status.lock().unwrap() = Some(status.to_string());
                    }
                }
            }));
        }

        if !channel.send(&ClientEvent::Subscribe { booking_id }) {
            for subscription in &subscriptions {
                subscription.cancel();
            }
            return Err(not_connected_error());
        }

        // reconciliation read: offers submitted before the subscription
        // cannot arrive as events, so merge the point-in-time snapshot in.
        // Anything already on the board came in after the subscribe and is
        // newer than the snapshot.
        let snapshot = match rest.fetch_offers(&booking_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                // a failed watch leaves nothing behind: no topic
                // subscription, no registered handlers
                let _ = channel.send(&ClientEvent::Unsubscribe { booking_id });
                for subscription in &subscriptions {
                    subscription.cancel();
                }
                return Err(err);
            }
        };
        {
            let mut board = board.lock().unwrap();
            for offer in snapshot {
                if !board.contains_driver(&offer.driver_id) {
                    board.upsert(offer);
                }
            }
        }

        Ok(Self {
            rest,
            channel,
            booking_id,
            board,
            selection,
            last_status,
            subscriptions,
        })
    }

    pub fn booking_id(&self) -> Uuid {
        self.booking_id
    }

    /// Read-only view of the offers seen so far, in first-seen order.
    pub fn offers(&self) -> Vec<Offer> {
        self.board.lock().unwrap().snapshot()
    }

    pub fn selection(&self) -> Selection {
        self.selection.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<String> {
        self.last_status.lock().unwrap().clone()
    }

    /// Commits to a driver. Refused while a previous selection is in flight;
    /// only the server acknowledgment confirms it. A failed request resets
    /// the guard and leaves the offer board untouched.
    pub async fn select(&self, driver_id: Uuid) -> Result<Booking, Error> {
        self.selection.lock().unwrap().try_begin(driver_id)?;

        match self.rest.select_driver(&self.booking_id, driver_id).await {
            Ok(booking) => {
                self.selection.lock().unwrap().confirm();
                Ok(booking)
            }
            Err(err) => {
                self.selection.lock().unwrap().reset();
                Err(err)
            }
        }
    }

    pub async fn cancel(&self) -> Result<Booking, Error> {
        self.rest.cancel_booking(&self.booking_id).await
    }

    /// Stops watching: unsubscribes from the topic and drops all handlers.
    pub fn unwatch(self) {
        let _ = self.channel.send(&ClientEvent::Unsubscribe {
            booking_id: self.booking_id,
        });

        for subscription in &self.subscriptions {
            subscription.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_guard_blocks_while_pending() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut selection = Selection::Idle;
        selection.try_begin(first).unwrap();

        let err = selection.try_begin(second).unwrap_err();
        assert!(err.is_invalid_state_error());
        assert_eq!(selection, Selection::Pending { driver_id: first });
    }

    #[test]
    fn failed_selection_resets_to_idle() {
        let driver_id = Uuid::new_v4();

        let mut selection = Selection::Idle;
        selection.try_begin(driver_id).unwrap();
        selection.reset();

        assert_eq!(selection, Selection::Idle);
        selection.try_begin(driver_id).unwrap();
    }

    #[tokio::test]
    async fn failed_reconciliation_unregisters_all_handlers() {
        use crate::api::SessionAPI;
        use crate::client::connection::Credentials;
        use crate::engine::Engine;
        use crate::server::router;

        let engine = Engine::new();
        let user = crate::auth::User::new_rider();
        let token = engine.issue_token(user).await.unwrap();

        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
            .serve(router(engine).into_make_service());
        let addr = server.local_addr();
        tokio::spawn(async move {
            let _ = server.await;
        });

        let channel = ChannelClient::default();
        channel
            .connect(Credentials {
                endpoint: format!("ws://{}", addr),
                token: token.clone(),
            })
            .await
            .unwrap();

        let rest = RestClient::new(format!("http://{}", addr), token);

        // no such booking: the reconciliation read fails after the subscribe
        let err = RiderSession::watch(rest, channel.clone(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.message, "not found");

        // the aborted watch must not leave handlers behind
        assert_eq!(channel.listener_count(events::BOOKING_NEW_OFFER), 0);
        assert_eq!(channel.listener_count(events::BOOKING_CANCELLED), 0);
        assert_eq!(channel.listener_count(events::BOOKING_STATUS_UPDATED), 0);
    }

    #[test]
    fn confirmed_selection_is_terminal() {
        let driver_id = Uuid::new_v4();

        let mut selection = Selection::Idle;
        selection.try_begin(driver_id).unwrap();
        selection.confirm();

        assert_eq!(selection, Selection::Confirmed { driver_id });
        assert!(selection.try_begin(Uuid::new_v4()).is_err());
    }
}
