//! Live job status over WebSocket.

use crate::hub::{serve_connection, HubHandle};
use crate::server::AppContext;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{future, SinkExt, StreamExt, TryStreamExt};

pub fn status_routes() -> Router<AppContext> {
    Router::new().route("/queue/status", get(status_socket))
}

async fn status_socket(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx.hub))
}

/// Text frames in both directions; every other frame type is ignored on read.
async fn handle_socket(socket: WebSocket, hub: HubHandle) {
    let (sink, stream) = socket.split();

    let sink = sink.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text))));
    let stream = stream.try_filter_map(|message| {
        future::ready(Ok(match message {
            Message::Text(text) => Some(text),
            _ => None,
        }))
    });

    serve_connection(hub, sink, stream).await;
}
