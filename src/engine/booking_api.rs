use async_trait::async_trait;
use uuid::Uuid;

use super::Engine;

use crate::{
    api::{BookingAPI, CreateBookingParams, OfferParams},
    auth::User,
    entities::{Booking, Offer, OfferBoard},
    error::{invalid_input_error, invalid_state_error, not_found_error, unauthorized_error, Error},
    protocol::ServerEvent,
};

#[async_trait]
impl BookingAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_booking(
        &self,
        user: User,
        params: CreateBookingParams,
    ) -> Result<Booking, Error> {
        if !user.is_rider() {
            return Err(unauthorized_error());
        }

        let booking = Booking::new(user.id, params.pickup, params.dropoff, params.passengers);

        {
            let mut bookings = self.bookings.write().await;
            bookings.insert(booking.id, booking.clone());

            let mut offers = self.offers.write().await;
            offers.insert(booking.id, OfferBoard::new());
        }

        // the requesting rider watches their own booking's topic from the start
        if self.sessions.is_connected(&user.id).await {
            self.topics.subscribe(booking.id, user.id).await;
        }

        let eligible = self.broadcast_eligible_drivers().await;
        tracing::info!(
            booking_id = %booking.id,
            drivers = eligible.len(),
            "fanning booking out to online drivers"
        );
        self.sessions
            .send_to_each(
                &eligible,
                ServerEvent::BookingNew {
                    booking: booking.clone(),
                },
            )
            .await;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, user: User, id: Uuid) -> Result<Booking, Error> {
        let bookings = self.bookings.read().await;
        let booking = bookings.get(&id).ok_or_else(not_found_error)?;

        if booking.rider_id != user.id && !user.is_driver() {
            return Err(unauthorized_error());
        }

        Ok(booking.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn available_bookings(&self, user: User) -> Result<Vec<Booking>, Error> {
        if !user.is_driver() {
            return Err(unauthorized_error());
        }

        let bookings = self.bookings.read().await;

        let mut available: Vec<Booking> = bookings
            .values()
            .filter(|booking| booking.is_collecting())
            .cloned()
            .collect();
        available.sort_by_key(|booking| booking.requested_at);

        Ok(available)
    }

    #[tracing::instrument(skip(self))]
    async fn list_offers(&self, user: User, id: Uuid) -> Result<Vec<Offer>, Error> {
        let bookings = self.bookings.read().await;
        let booking = bookings.get(&id).ok_or_else(not_found_error)?;

        if booking.rider_id != user.id {
            return Err(unauthorized_error());
        }

        let offers = self.offers.read().await;
        let snapshot = offers
            .get(&id)
            .map(|board| board.snapshot())
            .unwrap_or_default();

        Ok(snapshot)
    }

    #[tracing::instrument(skip(self))]
    async fn submit_offer(
        &self,
        user: User,
        id: Uuid,
        params: OfferParams,
    ) -> Result<Offer, Error> {
        if !user.is_driver() {
            return Err(unauthorized_error());
        }

        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&id).ok_or_else(not_found_error)?;

        if !booking.is_collecting() {
            return Err(invalid_state_error());
        }

        {
            let drivers = self.drivers.read().await;
            let driver = drivers.get(&user.id).ok_or_else(invalid_state_error)?;
            if !driver.is_online() {
                return Err(invalid_state_error());
            }
        }

        let first_offer = match booking.status {
            crate::entities::BookingStatus::Requested => {
                booking.begin_collecting()?;
                true
            }
            _ => false,
        };

        let offer = Offer::new(id, user.id, params.driver_name, params.rating, params.vehicle);

        {
            let mut offers = self.offers.write().await;
            let board = offers.entry(id).or_insert_with(OfferBoard::new);
            let replaced = board.upsert(offer.clone());
            tracing::info!(booking_id = %id, driver_id = %user.id, replaced, "offer recorded");
        }

        // an offering driver follows the booking's status stream from now on
        self.topics.subscribe(id, user.id).await;

        // published while the bookings lock is held, so events for this topic
        // leave in mutation order
        let subscribers = self.topics.subscribers(&id).await;
        if first_offer {
            self.sessions
                .send_to_each(
                    &subscribers,
                    ServerEvent::StatusUpdated {
                        booking_id: id,
                        status: booking.status.name(),
                    },
                )
                .await;
        }
        self.sessions
            .send_to_each(
                &subscribers,
                ServerEvent::NewOffer {
                    offer: offer.clone(),
                },
            )
            .await;

        Ok(offer)
    }

    #[tracing::instrument(skip(self))]
    async fn select_driver(&self, user: User, id: Uuid, driver_id: Uuid)
        -> Result<Booking, Error> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&id).ok_or_else(not_found_error)?;

        if booking.rider_id != user.id {
            return Err(unauthorized_error());
        }

        let mut drivers = self.drivers.write().await;
        let mut offers = self.offers.write().await;

        let board = offers.get(&id).ok_or_else(invalid_state_error)?;
        if !board.contains_driver(&driver_id) {
            return Err(invalid_input_error());
        }

        let driver = drivers.get_mut(&driver_id).ok_or_else(invalid_state_error)?;
        if !driver.is_online() {
            // the offer is still visible, but its driver has since dropped off
            return Err(invalid_state_error());
        }

        // the state machine is what rejects a second selection; nothing below
        // runs unless this transition succeeds
        booking.select(driver_id)?;
        booking.start()?;
        driver.assign(id)?;

        offers.remove(&id);

        let subscribers = self.topics.close(&id).await;
        for subscriber in subscribers {
            if subscriber == driver_id {
                self.sessions
                    .send_to(
                        &subscriber,
                        ServerEvent::Accepted {
                            booking_id: id,
                            driver_id,
                        },
                    )
                    .await;
                self.sessions
                    .send_to(
                        &subscriber,
                        ServerEvent::Assigned {
                            booking: booking.clone(),
                        },
                    )
                    .await;
            } else if subscriber != booking.rider_id {
                self.sessions
                    .send_to(&subscriber, ServerEvent::Taken { booking_id: id })
                    .await;
            }
        }

        tracing::info!(booking_id = %id, driver_id = %driver_id, "driver selected");

        Ok(booking.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_booking(&self, user: User, id: Uuid) -> Result<Booking, Error> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&id).ok_or_else(not_found_error)?;

        let is_party = booking.rider_id == user.id || booking.driver_id == Some(user.id);
        if !is_party {
            return Err(unauthorized_error());
        }

        let freed_driver_id = booking.cancel()?;

        if let Some(driver_id) = freed_driver_id {
            let mut drivers = self.drivers.write().await;
            if let Some(driver) = drivers.get_mut(&driver_id) {
                driver.free()?;
            }
        }

        {
            let mut offers = self.offers.write().await;
            offers.remove(&id);
        }

        let subscribers = self.topics.close(&id).await;
        for subscriber in subscribers {
            // the freed driver is notified separately below, exactly once
            if Some(subscriber) == freed_driver_id {
                continue;
            }
            self.sessions
                .send_to(&subscriber, ServerEvent::Cancelled { booking_id: id })
                .await;
        }

        // the assigned driver may have already left the topic
        if let Some(driver_id) = freed_driver_id {
            self.sessions
                .send_to(&driver_id, ServerEvent::Cancelled { booking_id: id })
                .await;
        }

        tracing::info!(booking_id = %id, "booking cancelled");

        Ok(booking.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn complete_booking(&self, user: User, id: Uuid) -> Result<Booking, Error> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&id).ok_or_else(not_found_error)?;

        let is_party = booking.rider_id == user.id || booking.driver_id == Some(user.id);
        if !is_party {
            return Err(unauthorized_error());
        }

        booking.complete()?;

        if let Some(driver_id) = booking.driver_id {
            let mut drivers = self.drivers.write().await;
            if let Some(driver) = drivers.get_mut(&driver_id) {
                driver.free()?;
            }
        }

        let update = ServerEvent::StatusUpdated {
            booking_id: id,
            status: booking.status.name(),
        };
        self.sessions.send_to(&booking.rider_id, update.clone()).await;
        if let Some(driver_id) = booking.driver_id {
            self.sessions.send_to(&driver_id, update).await;
        }

        Ok(booking.clone())
    }
}

impl Engine {
    pub(super) async fn broadcast_eligible_drivers(&self) -> Vec<Uuid> {
        let drivers = self.drivers.read().await;

        drivers
            .values()
            .filter(|driver| driver.is_online())
            .map(|driver| driver.id)
            .collect()
    }
}
