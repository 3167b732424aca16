//! Per-subscriber relay between a transport session and the hub.

use std::fmt::Display;

use futures::{Sink, SinkExt, Stream, StreamExt};

use super::{ConnectionId, HubHandle, Subscription};

/// Unregisters a connection when dropped, whichever way the reader exits.
struct UnregisterGuard {
    hub: HubHandle,
    id: ConnectionId,
}

impl Drop for UnregisterGuard {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

/// Relay one subscriber session until either direction fails.
///
/// The connection is registered with the hub before the writer starts. The
/// writer drains the outbound buffer into `sink`; the reader re-publishes every
/// inbound message from `stream` through the hub. Whichever side stops first
/// cancels the other, the sink is closed, and the connection is unregistered.
pub async fn serve_connection<S, R, SE, RE>(hub: HubHandle, mut sink: S, mut stream: R)
where
    S: Sink<String, Error = SE> + Unpin + Send + 'static,
    SE: Display + Send + 'static,
    R: Stream<Item = Result<String, RE>> + Unpin + Send + 'static,
    RE: Display + Send + 'static,
{
    let Subscription {
        id,
        mut outbound,
        closed,
    } = hub.register();
    let _guard = UnregisterGuard {
        hub: hub.clone(),
        id,
    };
    tracing::debug!(connection = %id, "Subscriber connected");

    let writer_closed = closed.clone();
    let writer = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                biased;
                _ = writer_closed.cancelled() => break,
                message = outbound.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            if let Err(e) = sink.send(message).await {
                tracing::debug!(connection = %id, error = %e, "Send to subscriber failed");
                break;
            }
        }
        let _ = sink.close().await;
        writer_closed.cancel();
    });

    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            next = stream.next() => match next {
                Some(Ok(message)) => hub.publish(message),
                Some(Err(e)) => {
                    tracing::debug!(connection = %id, error = %e, "Receive from subscriber failed");
                    break;
                }
                None => break,
            },
        }
    }

    closed.cancel();
    let _ = writer.await;
    tracing::debug!(connection = %id, "Subscriber disconnected");
}
