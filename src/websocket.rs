use std::{net::SocketAddr, sync::Arc};

use tokio::sync::mpsc;

use futures::{sink::Sink, stream::Stream, SinkExt, StreamExt};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension, TypedHeader,
};

use tracing::{debug, info, info_span, trace, Instrument};

use crate::{
    record::TelemetryRecord,
    registry::{SubscriberId, SubscriberRegistry},
};

/// How many records a subscriber may lag behind before sends to it
/// start waiting (and, past the send timeout, get it removed).
const SUBSCRIBER_BUFFER: usize = 64;

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(registry): Extension<Arc<SubscriberRegistry>>,
) -> impl IntoResponse {
    if let Some(TypedHeader(user_agent)) = user_agent {
        info!("`{}`@`{addr}` connected", user_agent.as_str());
    }

    ws.on_upgrade(move |socket| handle_subscriber(socket, addr, registry))
}

pub(crate) async fn read<S>(mut receiver: S, id: SubscriberId)
where
    S: Unpin,
    S: Stream<Item = Result<Message, axum::Error>>,
{
    // The relay is broadcast only. Whatever a subscriber sends is
    // logged and dropped.
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                debug!(%id, %text, "Ignoring inbound text");
            }
            Message::Binary(_) => {
                debug!(%id, "Ignoring inbound binary data");
            }
            Message::Ping(_) => {
                trace!(%id, "Socket ping");
            }
            Message::Pong(_) => {
                trace!(%id, "Socket pong");
            }
            Message::Close(_) => {
                debug!(%id, "Subscriber closed the connection");
                break;
            }
        }
    }

    debug!(%id, "Subscriber stream ended");
}

pub(crate) async fn write(
    mut sender: impl Sink<Message> + Unpin,
    mut records: mpsc::Receiver<TelemetryRecord>,
) {
    while let Some(record) = records.recv().await {
        // The exact validated record text, no envelope.
        if sender.send(Message::Text(record.into_inner())).await.is_err() {
            debug!("Subscriber disconnected");
            return;
        }
        trace!("Record flushed");
    }

    // Channel closed: the broadcaster removed us.
    debug!("Record channel closed");
}

pub(crate) async fn handle_subscriber(
    websocket: WebSocket,
    addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
) {
    let (record_sender, record_receiver) = mpsc::channel::<TelemetryRecord>(SUBSCRIBER_BUFFER);

    let id = registry.add(record_sender);
    info!(%id, %addr, "Subscriber registered");

    let (stream_sender, stream_receiver) = websocket.split();

    let span = info_span!("Subscriber", %id, %addr);

    let mut read_handle =
        tokio::spawn(read(stream_receiver, id).instrument(info_span!(parent: &span, "Read")));
    let mut write_handle = tokio::spawn(
        write(stream_sender, record_receiver).instrument(info_span!(parent: &span, "Write")),
    );
    drop(span);

    // Reading ends when the remote closes; writing ends when the
    // broadcaster removes us. Either way the session is over, and
    // aborting the other task closes the underlying TCP connection.
    tokio::select! {
        _ = &mut read_handle => write_handle.abort(),
        _ = &mut write_handle => read_handle.abort(),
    }

    registry.remove(id);
    info!(%id, %addr, "Subscriber deregistered");
}
