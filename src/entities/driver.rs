use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{invalid_state_error, Error};

/// A driver's presence record. Only `Online` drivers are eligible to receive
/// new-booking broadcasts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub status: Status,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Offline,
    Online,
    Busy { booking_id: Uuid },
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Offline => "offline".into(),
            Self::Online => "online".into(),
            Self::Busy { booking_id: _ } => "busy".into(),
        }
    }
}

impl Driver {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: user_id,
            status: Status::Offline,
        }
    }

    pub fn is_online(&self) -> bool {
        match self.status {
            Status::Online => true,
            _ => false,
        }
    }

    #[tracing::instrument]
    pub fn go_online(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Offline => {
                self.status = Status::Online;
                Ok(())
            }
            Status::Online => Ok(()),
            _ => Err(invalid_state_error()),
        }
    }

    #[tracing::instrument]
    pub fn go_offline(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Online | Status::Offline => {
                self.status = Status::Offline;
                Ok(())
            }
            // a driver on an active ride cannot drop out of it by toggling
            _ => Err(invalid_state_error()),
        }
    }

    #[tracing::instrument]
    pub fn assign(&mut self, booking_id: Uuid) -> Result<(), Error> {
        match self.status {
            Status::Online => {
                self.status = Status::Busy { booking_id };
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    #[tracing::instrument]
    pub fn free(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Busy { booking_id: _ } => {
                self.status = Status::Online;
            }
            _ => (),
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_transitions() {
        let mut driver = Driver::new(Uuid::new_v4());
        assert!(!driver.is_online());

        driver.go_online().unwrap();
        assert!(driver.is_online());

        let booking_id = Uuid::new_v4();
        driver.assign(booking_id).unwrap();
        assert!(!driver.is_online());
        assert_eq!(driver.status.name(), "busy");

        driver.free().unwrap();
        assert!(driver.is_online());

        driver.go_offline().unwrap();
        assert_eq!(driver.status.name(), "offline");
    }

    #[test]
    fn busy_driver_cannot_toggle_offline() {
        let mut driver = Driver::new(Uuid::new_v4());
        driver.go_online().unwrap();
        driver.assign(Uuid::new_v4()).unwrap();

        assert!(driver.go_offline().unwrap_err().is_invalid_state_error());
    }

    #[test]
    fn offline_driver_cannot_take_assignment() {
        let mut driver = Driver::new(Uuid::new_v4());
        assert!(driver
            .assign(Uuid::new_v4())
            .unwrap_err()
            .is_invalid_state_error());
    }
}
