use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::User;
use crate::protocol::ServerEvent;

/// One live channel per authenticated actor. A user reconnecting replaces
/// their previous entry; the superseded sender is dropped, which ends the
/// old connection's writer task.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

struct Session {
    connection_id: Uuid,
    tx: UnboundedSender<ServerEvent>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a connection and returns its id, used to guard cleanup
    /// against a stale disconnect racing a fresh register.
    pub async fn register(&self, user: &User, tx: UnboundedSender<ServerEvent>) -> Uuid {
        let connection_id = Uuid::new_v4();

        let mut sessions = self.sessions.write().await;
        sessions.insert(
            user.id,
            Session {
                connection_id,
                tx,
            },
        );

        connection_id
    }

    /// Removes the session only if it still belongs to this connection.
    pub async fn unregister(&self, user_id: &Uuid, connection_id: &Uuid) -> bool {
        let mut sessions = self.sessions.write().await;

        match sessions.get(user_id) {
            Some(session) if &session.connection_id == connection_id => {
                sessions.remove(user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn is_connected(&self, user_id: &Uuid) -> bool {
        self.sessions.read().await.contains_key(user_id)
    }

    /// Delivery is best-effort: a closed channel just means the client is
    /// already gone.
    pub async fn send_to(&self, user_id: &Uuid, event: ServerEvent) -> bool {
        let sessions = self.sessions.read().await;

        match sessions.get(user_id) {
            Some(session) => session.tx.send(event).is_ok(),
            None => false,
        }
    }

    pub async fn send_to_each(&self, user_ids: &[Uuid], event: ServerEvent) {
        let sessions = self.sessions.read().await;

        for user_id in user_ids {
            if let Some(session) = sessions.get(user_id) {
                let _ = session.tx.send(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn reconnect_replaces_the_previous_session() {
        use tokio_test::block_on;

        let registry = SessionRegistry::new();
        let user = User::new_rider();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let first = block_on(registry.register(&user, tx1));

        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let second = block_on(registry.register(&user, tx2));

        let event = ServerEvent::Taken {
            booking_id: Uuid::new_v4(),
        };
        assert!(block_on(registry.send_to(&user.id, event)));
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());

        // the stale connection's cleanup must not tear down the new session
        assert!(!block_on(registry.unregister(&user.id, &first)));
        assert!(block_on(registry.is_connected(&user.id)));
        assert!(block_on(registry.unregister(&user.id, &second)));
        assert!(!block_on(registry.is_connected(&user.id)));
    }
}
