use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use uuid::Uuid;

/// Maps a booking to the set of actors subscribed to its event stream.
///
/// Entries are ephemeral: nothing here is persisted, and a topic disappears
/// when its booking concludes. Subscribing to a topic that never existed is
/// harmless, the subscriber simply receives no events.
pub struct TopicRegistry {
    topics: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    pub async fn subscribe(&self, booking_id: Uuid, user_id: Uuid) {
        let mut topics = self.topics.write().await;
        topics.entry(booking_id).or_default().insert(user_id);
    }

    pub async fn unsubscribe(&self, booking_id: &Uuid, user_id: &Uuid) {
        let mut topics = self.topics.write().await;

        if let Some(subscribers) = topics.get_mut(booking_id) {
            subscribers.remove(user_id);
            if subscribers.is_empty() {
                topics.remove(booking_id);
            }
        }
    }

    pub async fn subscribers(&self, booking_id: &Uuid) -> Vec<Uuid> {
        let topics = self.topics.read().await;

        topics
            .get(booking_id)
            .map(|subscribers| subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tears the topic down, returning whoever was still subscribed.
    pub async fn close(&self, booking_id: &Uuid) -> Vec<Uuid> {
        let mut topics = self.topics.write().await;

        topics
            .remove(booking_id)
            .map(|subscribers| subscribers.into_iter().collect())
            .unwrap_or_default()
    }

    /// Drops one actor from every topic, used on disconnect.
    pub async fn drop_subscriber(&self, user_id: &Uuid) {
        let mut topics = self.topics.write().await;

        topics.retain(|_, subscribers| {
            subscribers.remove(user_id);
            !subscribers.is_empty()
        });
    }
}
