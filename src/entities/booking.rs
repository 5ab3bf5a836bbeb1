use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Place;
use crate::error::{invalid_state_error, Error};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub status: Status,
    pub rider_id: Uuid,
    pub pickup: Place,
    pub dropoff: Place,
    pub passengers: u32,
    pub requested_at: DateTime<Utc>,
    pub driver_id: Option<Uuid>,
}

/// Per-booking dispatch lifecycle. Transitions only move forward; `Cancelled`
/// is reachable from every non-terminal state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Requested,
    OfferCollecting,
    DriverSelected { driver_id: Uuid },
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Requested => "requested".into(),
            Self::OfferCollecting => "offer_collecting".into(),
            Self::DriverSelected { driver_id: _ } => "driver_selected".into(),
            Self::InProgress => "in_progress".into(),
            Self::Completed => "completed".into(),
            Self::Cancelled => "cancelled".into(),
        }
    }
}

impl Booking {
    pub fn new(rider_id: Uuid, pickup: Place, dropoff: Place, passengers: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: Status::Requested,
            rider_id,
            pickup,
            dropoff,
            passengers,
            requested_at: Utc::now(),
            driver_id: None,
        }
    }

    pub fn is_collecting(&self) -> bool {
        match self.status {
            Status::Requested | Status::OfferCollecting => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self.status {
            Status::Completed | Status::Cancelled => true,
            _ => false,
        }
    }

    /// First offer arrival moves the booking into collection.
    #[tracing::instrument]
    pub fn begin_collecting(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Requested => {
                self.status = Status::OfferCollecting;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    /// Marks the winning driver. Valid only while offers are being collected,
    /// which is what makes a second selection fail instead of overwriting the
    /// first.
    #[tracing::instrument]
    pub fn select(&mut self, driver_id: Uuid) -> Result<(), Error> {
        match self.status {
            Status::Requested | Status::OfferCollecting => {
                self.status = Status::DriverSelected { driver_id };
                self.driver_id = Some(driver_id);
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    #[tracing::instrument]
    pub fn start(&mut self) -> Result<Uuid, Error> {
        match self.status {
            Status::DriverSelected { driver_id } => {
                self.status = Status::InProgress;
                Ok(driver_id)
            }
            _ => Err(invalid_state_error()),
        }
    }

    #[tracing::instrument]
    pub fn complete(&mut self) -> Result<(), Error> {
        match self.status {
            Status::InProgress => {
                self.status = Status::Completed;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    /// Returns the driver to free, if one was already holding the booking.
    #[tracing::instrument]
    pub fn cancel(&mut self) -> Result<Option<Uuid>, Error> {
        if self.is_terminal() {
            return Err(invalid_state_error());
        }

        let freed_driver_id = match self.status {
            Status::DriverSelected { driver_id } => Some(driver_id),
            Status::InProgress => self.driver_id,
            _ => None,
        };

        self.status = Status::Cancelled;
        Ok(freed_driver_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Place;

    fn booking() -> Booking {
        Booking::new(
            Uuid::new_v4(),
            Place::new("Thamel".into(), 27.7154, 85.3123),
            Place::new("Boudhanath".into(), 27.7215, 85.3620),
            1,
        )
    }

    #[test]
    fn full_lifecycle() {
        let mut b = booking();
        let driver_id = Uuid::new_v4();

        assert!(b.is_collecting());
        b.begin_collecting().unwrap();
        b.select(driver_id).unwrap();
        assert_eq!(b.start().unwrap(), driver_id);
        assert_eq!(b.driver_id, Some(driver_id));
        b.complete().unwrap();
        assert!(b.is_terminal());
        assert_eq!(b.status.name(), "completed");
    }

    #[test]
    fn second_selection_is_rejected() {
        let mut b = booking();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        b.begin_collecting().unwrap();
        b.select(first).unwrap();

        let err = b.select(second).unwrap_err();
        assert!(err.is_invalid_state_error());
        assert_eq!(b.driver_id, Some(first));
    }

    #[test]
    fn no_backward_transitions() {
        let mut b = booking();
        b.begin_collecting().unwrap();
        assert!(b.begin_collecting().unwrap_err().is_invalid_state_error());

        b.select(Uuid::new_v4()).unwrap();
        b.start().unwrap();
        assert!(b.begin_collecting().unwrap_err().is_invalid_state_error());
        assert!(b.start().unwrap_err().is_invalid_state_error());
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        let mut requested = booking();
        assert_eq!(requested.cancel().unwrap(), None);

        let mut selected = booking();
        let driver_id = Uuid::new_v4();
        selected.begin_collecting().unwrap();
        selected.select(driver_id).unwrap();
        assert_eq!(selected.cancel().unwrap(), Some(driver_id));

        let mut completed = booking();
        completed.begin_collecting().unwrap();
        completed.select(driver_id).unwrap();
        completed.start().unwrap();
        completed.complete().unwrap();
        assert!(completed.cancel().unwrap_err().is_invalid_state_error());
    }

    #[test]
    fn status_serializes_with_tagged_name() {
        let b = booking();
        let value = serde_json::to_value(&b).unwrap();
        assert_eq!(value["status"]["name"], "requested");
        assert_eq!(value["riderId"], serde_json::json!(b.rider_id));
    }
}
