//! Status broadcast hub.
//!
//! [`StatusHub`] owns every live subscriber connection and fans each published
//! message out to all of them. The connection set is only ever touched inside
//! [`StatusHub::run`]; everything else talks to the hub through a cloneable
//! [`HubHandle`], so register, unregister and publish are applied in one total
//! order.
//!
//! Delivery to a subscriber is a non-blocking enqueue onto its bounded outbound
//! buffer. A subscriber whose buffer is full is evicted on the spot: removed
//! from the set, its buffer closed and its transport told to shut down. A
//! publish therefore never waits on a subscriber.

mod connection;

pub use connection::serve_connection;

use std::collections::HashMap;
use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Capacity of each subscriber's outbound buffer.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Identifier of one registered subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The subscriber side of a registration.
///
/// `outbound` yields every message published after registration, in publish
/// order. `closed` is cancelled when the hub evicts the connection or when
/// either side of the transport gives up.
#[derive(Debug)]
pub struct Subscription {
    pub id: ConnectionId,
    pub outbound: mpsc::Receiver<String>,
    pub closed: CancellationToken,
}

/// Hub-side state of a registered connection.
struct Member {
    sender: mpsc::Sender<String>,
    closed: CancellationToken,
}

enum Command {
    Register {
        id: ConnectionId,
        sender: mpsc::Sender<String>,
        closed: CancellationToken,
    },
    Unregister(ConnectionId),
    Publish(String),
    Count(oneshot::Sender<usize>),
}

/// Cloneable control surface of a running [`StatusHub`].
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl HubHandle {
    /// Queue `message` for delivery to every registered connection.
    ///
    /// Never blocks.
    pub fn publish(&self, message: impl Into<String>) {
        if self.tx.send(Command::Publish(message.into())).is_err() {
            tracing::debug!("Status hub stopped; dropping message");
        }
    }

    /// Register a new connection and return its subscription.
    pub fn register(&self) -> Subscription {
        let id = ConnectionId::new();
        let (sender, outbound) = mpsc::channel(OUTBOUND_CAPACITY);
        let closed = CancellationToken::new();

        let command = Command::Register {
            id,
            sender,
            closed: closed.clone(),
        };
        if self.tx.send(command).is_err() {
            // No hub to deliver anything: the sender was dropped with the
            // command, so `outbound` is already closed.
            closed.cancel();
        }

        Subscription {
            id,
            outbound,
            closed,
        }
    }

    /// Remove a connection from the live set. Unknown ids are ignored.
    pub fn unregister(&self, id: ConnectionId) {
        let _ = self.tx.send(Command::Unregister(id));
    }

    /// Number of currently registered connections, as seen by the hub loop.
    pub async fn connection_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Count(reply)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// The broadcast hub. Create with [`StatusHub::new`], then drive
/// [`run`](Self::run) on its own task for the lifetime of the process.
pub struct StatusHub {
    rx: mpsc::UnboundedReceiver<Command>,
    connections: HashMap<ConnectionId, Member>,
}

impl StatusHub {
    pub fn new() -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            rx,
            connections: HashMap::new(),
        };
        (hub, HubHandle { tx })
    }

    /// Create a hub and spawn its loop on the current runtime.
    pub fn spawn() -> HubHandle {
        let (hub, handle) = Self::new();
        tokio::spawn(hub.run());
        handle
    }

    /// Process control messages one at a time.
    ///
    /// Returns once every [`HubHandle`] has been dropped.
    pub async fn run(mut self) {
        tracing::debug!("Status hub started");
        while let Some(command) = self.rx.recv().await {
            self.apply(command);
        }

        for (_, member) in self.connections.drain() {
            member.closed.cancel();
        }
        tracing::debug!("Status hub stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Register { id, sender, closed } => {
                self.connections.insert(id, Member { sender, closed });
                tracing::debug!(connection = %id, total = self.connections.len(), "Subscriber registered");
            }
            Command::Unregister(id) => {
                if self.connections.remove(&id).is_some() {
                    tracing::debug!(connection = %id, total = self.connections.len(), "Subscriber unregistered");
                }
            }
            Command::Publish(message) => self.publish(message),
            Command::Count(reply) => {
                let _ = reply.send(self.connections.len());
            }
        }
    }

    fn publish(&mut self, message: String) {
        self.connections.retain(|id, member| {
            match member.sender.try_send(message.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection = %id, "Subscriber too slow; evicting");
                    member.closed.cancel();
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(connection = %id, "Subscriber writer gone; removing");
                    member.closed.cancel();
                    false
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fan_out_preserves_order() {
        let hub = StatusHub::spawn();
        let mut subs: Vec<_> = (0..3).map(|_| hub.register()).collect();

        for i in 0..10 {
            hub.publish(format!("msg-{i}"));
        }

        for sub in subs.iter_mut() {
            for i in 0..10 {
                assert_eq!(sub.outbound.recv().await.unwrap(), format!("msg-{i}"));
            }
        }
        assert_eq!(hub.connection_count().await, 3);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let hub = StatusHub::spawn();
        let sub = hub.register();
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(sub.id);
        hub.unregister(sub.id);
        hub.unregister(ConnectionId::new());
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn full_buffer_evicts_once() {
        let hub = StatusHub::spawn();
        let mut slow = hub.register();
        let mut fast = hub.register();

        for i in 0..OUTBOUND_CAPACITY + 5 {
            hub.publish(format!("{i}"));
            // Keep the fast subscriber drained.
            assert_eq!(fast.outbound.recv().await.unwrap(), format!("{i}"));
        }

        assert_eq!(hub.connection_count().await, 1);
        assert!(slow.closed.is_cancelled());

        // Only what fit before the overflow was delivered, then the buffer closed.
        let mut received = 0;
        while slow.outbound.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, OUTBOUND_CAPACITY);
        assert!(!fast.closed.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_receiver_is_removed_on_publish() {
        let hub = StatusHub::spawn();
        let sub = hub.register();
        let closed = sub.closed.clone();
        drop(sub);

        hub.publish("hello");
        assert_eq!(hub.connection_count().await, 0);
        assert!(closed.is_cancelled());
    }

    #[tokio::test]
    async fn late_subscriber_sees_only_later_messages() {
        let hub = StatusHub::spawn();
        hub.publish("before");
        let mut sub = hub.register();
        hub.publish("after");
        assert_eq!(sub.outbound.recv().await.unwrap(), "after");
    }

    #[tokio::test]
    async fn stopped_hub_closes_registrations() {
        let (hub, handle) = StatusHub::new();
        drop(hub);
        let mut sub = handle.register();
        assert!(sub.closed.is_cancelled());
        assert!(sub.outbound.recv().await.is_none());
        assert_eq!(handle.connection_count().await, 0);
    }
}
