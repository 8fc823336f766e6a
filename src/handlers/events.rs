//! Live feed over Server-Sent Events. Browsers connect with
//! `EventSource('/api/v1/events?access_token=...')`.

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use std::{convert::Infallible, time::Duration};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::events::Event;
use crate::AppState;

fn to_sse(event: &Event) -> Option<SseEvent> {
    match serde_json::to_string(event) {
        Ok(data) => Some(SseEvent::default().event(event.name()).data(data)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "Failed to encode event");
            None
        }
    }
}

fn visible(
    user_id: Uuid,
    item: Result<Event, BroadcastStreamRecvError>,
) -> Option<Result<SseEvent, Infallible>> {
    match item {
        Ok(event) if event.is_visible_to(user_id) => to_sse(&event).map(Ok),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(%user_id, skipped, "Live feed subscriber lagged");
            Some(Ok(SseEvent::default()
                .event("lagged")
                .data(skipped.to_string())))
        }
    }
}

/// Subscribe to live updates for the signed-in user
#[utoipa::path(
    get,
    path = "/api/v1/events",
    params(("access_token" = Option<String>, Query, description = "Token for clients that cannot send headers")),
    responses((status = 200, description = "text/event-stream of events", content_type = "text/event-stream")),
    security(("Bearer" = [])),
    tag = "events"
)]
pub async fn event_stream(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let user_id = auth_user.user_id;
    debug!(%user_id, "Live feed subscriber connected");

    let ready = stream::once(async {
        Ok::<_, Infallible>(SseEvent::default().event("ready").data("{}"))
    });
    let updates = BroadcastStream::new(state.event_hub.subscribe())
        .filter_map(move |item| async move { visible(user_id, item) });

    Sse::new(ready.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
