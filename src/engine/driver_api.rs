use async_trait::async_trait;

use super::Engine;

use crate::{
    api::DriverAPI,
    auth::User,
    entities::Driver,
    error::{unauthorized_error, Error},
    protocol::ServerEvent,
};

#[async_trait]
impl DriverAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn driver_profile(&self, user: User) -> Result<Driver, Error> {
        if !user.is_driver() {
            return Err(unauthorized_error());
        }

        let mut drivers = self.drivers.write().await;
        let driver = drivers.entry(user.id).or_insert_with(|| Driver::new(user.id));

        Ok(driver.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn set_driver_status(&self, user: User, online: bool) -> Result<Driver, Error> {
        if !user.is_driver() {
            return Err(unauthorized_error());
        }

        let driver = {
            let mut drivers = self.drivers.write().await;
            let driver = drivers.entry(user.id).or_insert_with(|| Driver::new(user.id));

            if online {
                driver.go_online()?;
            } else {
                driver.go_offline()?;
            }

            driver.clone()
        };

        // the echoed event is the only signal the client renders status from
        self.sessions
            .send_to(
                &user.id,
                ServerEvent::DriverStatusUpdated {
                    driver_id: user.id,
                    status: driver.status.name(),
                },
            )
            .await;

        tracing::info!(driver_id = %user.id, status = %driver.status.name(), "presence updated");

        Ok(driver)
    }
}
