use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use super::AppState;

/// Server-sent events for one user. Notifications missed while the client
/// lagged behind are dropped.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    log::debug!("Notification stream opened for {}", user_id);
    let receiver = state.notifications.subscribe(&user_id);

    let stream = BroadcastStream::new(receiver).filter_map(|message| {
        message
            .ok()
            .map(|notification| Event::default().event(notification.kind()).json_data(&notification))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
