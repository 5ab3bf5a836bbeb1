use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub rating: f64,
    pub vehicle: String,
    pub submitted_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(
        booking_id: Uuid,
        driver_id: Uuid,
        driver_name: String,
        rating: f64,
        vehicle: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            driver_id,
            driver_name,
            rating,
            vehicle,
            submitted_at: Utc::now(),
        }
    }
}

/// The per-booking offer collection, keyed by driver identity.
///
/// Offers keep their first-seen position: a driver resubmitting replaces
/// their earlier offer in place, it never appends a duplicate entry or moves
/// the entry to the front.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OfferBoard {
    offers: Vec<Offer>,
}

impl OfferBoard {
    pub fn new() -> Self {
        Self { offers: Vec::new() }
    }

    /// Returns true when an existing offer from the same driver was replaced.
    pub fn upsert(&mut self, offer: Offer) -> bool {
        match self
            .offers
            .iter_mut()
            .find(|existing| existing.driver_id == offer.driver_id)
        {
            Some(existing) => {
                *existing = offer;
                true
            }
            None => {
                self.offers.push(offer);
                false
            }
        }
    }

    pub fn get(&self, driver_id: &Uuid) -> Option<&Offer> {
        self.offers.iter().find(|o| &o.driver_id == driver_id)
    }

    pub fn contains_driver(&self, driver_id: &Uuid) -> bool {
        self.get(driver_id).is_some()
    }

    pub fn snapshot(&self) -> Vec<Offer> {
        self.offers.clone()
    }

    pub fn driver_ids(&self) -> Vec<Uuid> {
        self.offers.iter().map(|o| o.driver_id).collect()
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn clear(&mut self) {
        self.offers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(booking_id: Uuid, driver_id: Uuid, vehicle: &str) -> Offer {
        Offer::new(booking_id, driver_id, "driver".into(), 4.5, vehicle.into())
    }

    #[test]
    fn resubmission_replaces_in_place() {
        let booking_id = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut board = OfferBoard::new();
        assert!(!board.upsert(offer(booking_id, first, "Pulsar 150")));
        assert!(!board.upsert(offer(booking_id, second, "Scorpio")));
        assert!(board.upsert(offer(booking_id, first, "Dio")));

        let snapshot = board.snapshot();
        assert_eq!(snapshot.len(), 2);
        // first-seen ordering survives the update
        assert_eq!(snapshot[0].driver_id, first);
        assert_eq!(snapshot[0].vehicle, "Dio");
        assert_eq!(snapshot[1].driver_id, second);
    }

    #[test]
    fn snapshot_is_detached_from_the_board() {
        let booking_id = Uuid::new_v4();
        let driver_id = Uuid::new_v4();

        let mut board = OfferBoard::new();
        board.upsert(offer(booking_id, driver_id, "Pulsar 150"));

        let snapshot = board.snapshot();
        board.clear();

        assert_eq!(snapshot.len(), 1);
        assert!(board.is_empty());
    }
}
