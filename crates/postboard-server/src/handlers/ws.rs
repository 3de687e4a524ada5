//! WebSocket handler for live comment feeds
//!
//! One socket watches one post: every comment created on it afterwards is
//! sent as a JSON text frame. Client frames are ignored apart from close.

use super::{ApiError, ErrorBody};
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub async fn live_comments(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Response {
    // Reject unknown posts before the upgrade so the client gets a status code
    if let Err(e) = state.posts.get(&post_id).await {
        return ApiError(e).into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, post_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, post_id: String) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = match state.comments.subscribe(&post_id).await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(
                "Live feed for post {} refused (conn_id={}): {}",
                post_id, connection_id, e
            );
            let body = ErrorBody {
                code: e.code().to_string(),
                message: e.to_string(),
            };
            if let Ok(json) = serde_json::to_string(&body) {
                let _ = sender.send(Message::Text(json)).await;
            }
            let _ = sender.close().await;
            return;
        }
    };
    let endpoint = subscription.id();
    info!(
        "Live feed opened: post={}, conn_id={}, endpoint={}",
        subscription.topic(),
        connection_id,
        endpoint
    );

    // Forward comments from the subscription to the socket
    let forward_conn_id = connection_id.clone();
    let mut forward_task = tokio::spawn(async move {
        while let Some(comment) = subscription.recv().await {
            match serde_json::to_string(&comment) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        debug!("Live feed client gone (conn_id={})", forward_conn_id);
                        break;
                    }
                }
                Err(e) => warn!("Failed to serialize comment {}: {}", comment.id, e),
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut forward_task => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => debug!("Ignoring client frame (conn_id={})", connection_id),
                Some(Err(e)) => {
                    warn!("WebSocket error (conn_id={}): {}", connection_id, e);
                    break;
                }
            },
        }
    }

    state.comments.unsubscribe(&post_id, endpoint);
    forward_task.abort();
    info!(
        "Live feed closed: post={}, conn_id={}",
        post_id, connection_id
    );
}
