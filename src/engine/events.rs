use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::Engine;

use crate::{
    api::{BookingAPI, CreateBookingParams, DriverAPI},
    auth::User,
    error::{unauthorized_error, Error},
    protocol::{ClientEvent, ServerEvent},
};

/// Channel-side entry points. The websocket handler owns the transport; the
/// engine owns everything the events mean.
impl Engine {
    pub async fn connect_session(
        &self,
        user: &User,
        tx: UnboundedSender<ServerEvent>,
    ) -> Uuid {
        let connection_id = self.sessions.register(user, tx).await;
        tracing::info!(user_id = %user.id, connection_id = %connection_id, "channel connected");

        connection_id
    }

    pub async fn disconnect_session(&self, user: &User, connection_id: &Uuid) {
        if !self.sessions.unregister(&user.id, connection_id).await {
            // a newer connection for this user already took over
            return;
        }

        self.topics.drop_subscriber(&user.id).await;

        // an idle driver drops off the eligibility pool; one mid-ride stays
        // busy, their booking is still live
        if user.is_driver() {
            let mut drivers = self.drivers.write().await;
            if let Some(driver) = drivers.get_mut(&user.id) {
                if driver.is_online() {
                    let _ = driver.go_offline();
                }
            }
        }

        tracing::info!(user_id = %user.id, connection_id = %connection_id, "channel disconnected");
    }

    #[tracing::instrument(skip(self))]
    pub async fn handle_event(&self, user: &User, event: ClientEvent) -> Result<(), Error> {
        match event {
            ClientEvent::Subscribe { booking_id } => {
                self.subscribe_topic(user, booking_id).await
            }
            ClientEvent::Unsubscribe { booking_id } => {
                self.topics.unsubscribe(&booking_id, &user.id).await;
                Ok(())
            }
            ClientEvent::GoOnline => {
                self.set_driver_status(user.clone(), true).await?;
                Ok(())
            }
            ClientEvent::GoOffline => {
                self.set_driver_status(user.clone(), false).await?;
                Ok(())
            }
            ClientEvent::RequestRide {
                pickup_location,
                dropoff_location,
                passengers,
            } => {
                if !user.is_rider() {
                    return Err(unauthorized_error());
                }

                let booking = self
                    .create_booking(
                        user.clone(),
                        CreateBookingParams {
                            pickup: pickup_location,
                            dropoff: dropoff_location,
                            passengers,
                        },
                    )
                    .await?;

                self.sessions
                    .send_to(
                        &user.id,
                        ServerEvent::StatusUpdated {
                            booking_id: booking.id,
                            status: booking.status.name(),
                        },
                    )
                    .await;

                Ok(())
            }
        }
    }

    async fn subscribe_topic(&self, user: &User, booking_id: Uuid) -> Result<(), Error> {
        let live = {
            let bookings = self.bookings.read().await;
            bookings
                .get(&booking_id)
                .map(|booking| !booking.is_terminal())
                .unwrap_or(false)
        };

        // subscribing to a concluded or unknown booking is tolerated; the
        // topic is simply never created, so no events will arrive
        if live {
            self.topics.subscribe(booking_id, user.id).await;
        } else {
            tracing::debug!(booking_id = %booking_id, "subscribe to dead topic ignored");
        }

        Ok(())
    }
}
