use crate::{
    app_state::AppState,
    services::connection::{ConnectionHandler, OutboundQueue},
};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/connect",
    tag = "voting",
    description = "Open the WebSocket of a voting client.",
    responses(
        (status = SWITCHING_PROTOCOLS, description = "WebSocket connection is established.")
    )
)]
pub async fn connect(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let connection = state.identities().new_connection();
    let (outbound, mut outbound_receiver) = OutboundQueue::new(
        connection,
        state.monitor_channel_warn_threshold(),
        state.monitor_channel_close_threshold(),
    );
    let overflow = outbound.clone();
    let handler = Arc::new(ConnectionHandler::with_id(connection, state, outbound));
    log::info!("[{}] Connected", handler.id());

    let mut recv_task = {
        let handler = handler.clone();
        tokio::spawn(async move {
            while let Some(Ok(message)) = ws_receiver.next().await {
                match message {
                    WsMessage::Text(text) => handler.handle_text(text.as_str()).await,
                    WsMessage::Close(_) => break,
                    WsMessage::Binary(_) => log::warn!("[{connection}] Binary message ignored"),
                    _ => {}
                }
            }
        })
    };

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound_receiver.recv().await {
            let data = match serde_json::to_string(&message) {
                Ok(data) => data,
                Err(err) => {
                    log::error!("[{connection}] Failed to serialize message {message:#?} with error {err:#?}");
                    continue;
                }
            };
            if let Err(err) = ws_sender.send(WsMessage::Text(data.into())).await {
                log::warn!("[{connection}] Failed to send message to the client: {err}");
                break;
            }
        }
    });

    // If any one of the tasks exit or the client stops reading, abort the tasks.
    tokio::select! {
        rv_a = (&mut send_task) => {
            log::debug!("[{connection}] Send task exited: {rv_a:?}");
            recv_task.abort();
        },
        rv_b = (&mut recv_task) => {
            log::debug!("[{connection}] Receive task exited: {rv_b:?}");
            send_task.abort();
        },
        _ = overflow.overflowed() => {
            log::warn!("[{connection}] Outbound queue overflowed, closing the connection");
            send_task.abort();
            recv_task.abort();
        }
    }

    handler.close().await;
}
