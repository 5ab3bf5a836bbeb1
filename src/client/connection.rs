use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::error::{connect_error, missing_token_error, Error};
use crate::protocol::{events, ClientEvent};

type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone, Debug)]
pub struct Credentials {
    /// Channel endpoint, e.g. `ws://127.0.0.1:3000`.
    pub endpoint: String,
    pub token: String,
}

/// Bounded retry schedule for a lost transport: a fixed number of attempts
/// with a doubling delay up to a cap, then a terminal failure. Tests compress
/// the schedule; the defaults are the production policy.
#[derive(Clone, Copy, Debug)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Client side of the booking channel: one transport per instance, a local
/// event-fanout registry, and automatic bounded reconnection.
///
/// All channel sends are fire-and-forget; `send` reports `false` when the
/// transport is down instead of queueing. Transport state changes surface as
/// synthetic `connection:status` events, and exhausting the reconnect budget
/// emits a single terminal `connection:failed` after which only an explicit
/// `connect` call resumes.
#[derive(Clone)]
pub struct ChannelClient {
    shared: Arc<Shared>,
}

struct Shared {
    policy: ReconnectPolicy,
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
    next_listener_id: AtomicU64,
    outbound: Mutex<Option<UnboundedSender<String>>>,
    connected: AtomicBool,
    // bumped by connect/disconnect so a superseded transport task can tell
    // it should wind down silently
    generation: AtomicU64,
}

struct Listener {
    id: u64,
    handler: Handler,
}

/// Unsubscribe guard returned by [`ChannelClient::on`]. Cancelling twice is
/// harmless.
pub struct Subscription {
    shared: Arc<Shared>,
    event: String,
    id: u64,
}

impl Subscription {
    pub fn cancel(&self) {
        let mut listeners = self.shared.listeners.lock().unwrap();

        if let Some(registered) = listeners.get_mut(&self.event) {
            registered.retain(|listener| listener.id != self.id);
            if registered.is_empty() {
                listeners.remove(&self.event);
            }
        }
    }
}

impl ChannelClient {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                policy,
                listeners: Mutex::new(HashMap::new()),
                next_listener_id: AtomicU64::new(0),
                outbound: Mutex::new(None),
                connected: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Establishes the channel. Fails fast without touching the network when
    /// no token is available. If a transport is already up it is torn down
    /// first, so at most one is ever active.
    pub async fn connect(&self, credentials: Credentials) -> Result<(), Error> {
        if credentials.token.trim().is_empty() {
            return Err(missing_token_error());
        }

        let url = format!(
            "{}/ws?token={}",
            credentials.endpoint.trim_end_matches('/'),
            credentials.token
        );

        let generation = self.shared.supersede();

        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(err) => {
                tracing::warn!("channel connect failed: {}", err);
                match self.shared.retry_connect(&url, generation).await {
                    Some(stream) => stream,
                    None => {
                        // retry_connect also gives up when a newer connect
                        // or disconnect superseded this attempt; only the
                        // current generation may declare terminal failure
                        if self.shared.is_current(generation) {
                            self.shared.emit(events::CONNECTION_FAILED, &json!({}));
                        }
                        return Err(connect_error());
                    }
                }
            }
        };

        let rx = match self.shared.install(generation) {
            Some(rx) => rx,
            // a concurrent connect/disconnect superseded this attempt
            None => return Err(connect_error()),
        };

        tokio::spawn(run_transport(self.shared.clone(), generation, stream, rx, url));

        Ok(())
    }

    pub fn disconnect(&self) {
        self.shared.supersede();
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Non-blocking publish. Returns false when not connected; intents are
    /// never queued for later.
    pub fn send(&self, event: &ClientEvent) -> bool {
        if !self.is_connected() {
            return false;
        }

        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(_) => return false,
        };

        let outbound = self.shared.outbound.lock().unwrap();
        match outbound.as_ref() {
            Some(tx) => tx.send(text).is_ok(),
            None => false,
        }
    }

    /// Registers a handler for a named event and returns its unsubscribe
    /// guard. Handlers run on the transport task; dispatch iterates a
    /// snapshot, so handlers may register or cancel freely.
    pub fn on(
        &self,
        event: &str,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::SeqCst);

        let mut listeners = self.shared.listeners.lock().unwrap();
        listeners.entry(event.to_string()).or_default().push(Listener {
            id,
            handler: Arc::new(handler),
        });

        Subscription {
            shared: self.shared.clone(),
            event: event.to_string(),
            id,
        }
    }
}

impl Default for ChannelClient {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

#[cfg(test)]
impl ChannelClient {
    pub(crate) fn listener_count(&self, event: &str) -> usize {
        self.shared
            .listeners
            .lock()
            .unwrap()
            .get(event)
            .map(|registered| registered.len())
            .unwrap_or(0)
    }
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Invalidates any live transport and returns the new generation.
    fn supersede(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut outbound = self.outbound.lock().unwrap();
            *outbound = None;
        }

        if self.connected.swap(false, Ordering::SeqCst) {
            self.emit_status(false);
        }

        generation
    }

    /// Wires a fresh mailbox up for the given generation, unless it has been
    /// superseded in the meantime.
    fn install(&self, generation: u64) -> Option<UnboundedReceiver<String>> {
        let mut outbound = self.outbound.lock().unwrap();

        if !self.is_current(generation) {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *outbound = Some(tx);
        self.connected.store(true, Ordering::SeqCst);
        drop(outbound);

        self.emit_status(true);

        Some(rx)
    }

    fn mark_disconnected(&self) {
        {
            let mut outbound = self.outbound.lock().unwrap();
            *outbound = None;
        }

        if self.connected.swap(false, Ordering::SeqCst) {
            self.emit_status(false);
        }
    }

    /// The bounded backoff loop. Returns None once the attempt budget is
    /// spent or the transport was superseded.
    async fn retry_connect(&self, url: &str, generation: u64) -> Option<Transport> {
        let mut delay = self.policy.initial_delay;

        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(delay).await;

            if !self.is_current(generation) {
                return None;
            }

            match connect_async(url).await {
                Ok((stream, _)) => {
                    tracing::info!(attempt, "channel reconnected");
                    return Some(stream);
                }
                Err(err) => {
                    tracing::warn!(attempt, "channel reconnect failed: {}", err);
                    delay = std::cmp::min(delay * 2, self.policy.max_delay);
                }
            }
        }

        None
    }

    fn dispatch_frame(&self, text: &str) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!("unparseable channel frame: {}", err);
                return;
            }
        };

        if let Some(event) = frame.get("event").and_then(Value::as_str) {
            let data = frame.get("data").cloned().unwrap_or(Value::Null);
            self.emit(event, &data);
        }
    }

    fn emit_status(&self, connected: bool) {
        self.emit(
            events::CONNECTION_STATUS,
            &json!({ "connected": connected }),
        );
    }

    /// Dispatches to a snapshot of the registered handlers, so a handler
    /// mutating the registry never races the iteration.
    fn emit(&self, event: &str, data: &Value) {
        let handlers: Vec<Handler> = {
            let listeners = self.listeners.lock().unwrap();
            listeners
                .get(event)
                .map(|registered| {
                    registered
                        .iter()
                        .map(|listener| listener.handler.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        for handler in handlers {
            handler(data);
        }
    }
}

async fn run_transport(
    shared: Arc<Shared>,
    generation: u64,
    mut stream: Transport,
    mut rx: UnboundedReceiver<String>,
    url: String,
) {
    loop {
        pump(&shared, &mut stream, &mut rx).await;

        if !shared.is_current(generation) {
            return;
        }

        shared.mark_disconnected();

        match shared.retry_connect(&url, generation).await {
            Some(new_stream) => {
                stream = new_stream;
                rx = match shared.install(generation) {
                    Some(rx) => rx,
                    None => return,
                };
            }
            None => {
                if shared.is_current(generation) {
                    shared.emit(events::CONNECTION_FAILED, &json!({}));
                }
                return;
            }
        }
    }
}

/// Drives one transport until it drops: outbound frames from the mailbox,
/// inbound frames into the fanout registry.
async fn pump(
    shared: &Shared,
    stream: &mut Transport,
    rx: &mut UnboundedReceiver<String>,
) {
    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(text) => {
                    if stream.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                None => {
                    // mailbox dropped: explicit disconnect or supersession
                    let _ = stream.close(None).await;
                    return;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => shared.dispatch_frame(&text),
                Some(Ok(Message::Close(_))) | None => return,
                Some(Err(_)) => return,
                Some(Ok(_)) => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_without_token_fails_before_any_network_attempt() {
        let client = ChannelClient::default();

        let err = client
            .connect(Credentials {
                endpoint: "ws://127.0.0.1:1".into(),
                token: "  ".into(),
            })
            .await
            .unwrap_err();

        assert!(err.is_missing_token_error());
        assert!(!client.is_connected());
    }

    #[test]
    fn send_while_disconnected_reports_false() {
        let client = ChannelClient::default();
        assert!(!client.send(&ClientEvent::GoOnline));
    }

    #[test]
    fn cancelled_handlers_stop_receiving() {
        let client = ChannelClient::default();
        let seen = Arc::new(AtomicU64::new(0));

        let counter = seen.clone();
        let subscription = client.on("booking:taken", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.shared.emit("booking:taken", &Value::Null);
        subscription.cancel();
        subscription.cancel();
        client.shared.emit("booking:taken", &Value::Null);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handlers_may_register_more_handlers_during_dispatch() {
        let client = ChannelClient::default();
        let seen = Arc::new(AtomicU64::new(0));

        let inner_client = client.clone();
        let counter = seen.clone();
        let _outer = client.on("connection:status", move |_| {
            let counter = counter.clone();
            inner_client.on("connection:status", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        // must not deadlock, and the newly registered handler only sees
        // subsequent dispatches
        client.shared.emit_status(false);
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        client.shared.emit_status(true);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
