use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use super::AppState;
use super::auth::{TokenQuery, supplied_token};
use crate::live::{Role, Viewer};

/// Long-lived event stream for one viewer.
///
/// The viewer's relay subscription lives inside the returned stream, so a
/// disconnect (which drops the stream) unregisters it.
pub async fn events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let role = if state.token.verify(supplied_token(&headers, &query)) {
        Role::Presenter
    } else {
        Role::Audience
    };
    let Viewer { events, drawings } = state.live.subscribe(role);

    let drawings = BroadcastStream::new(drawings).filter_map(|result| {
        futures::future::ready(match result {
            Ok(event) => Some(event),
            Err(e) => {
                debug!("drawing stream lagged: {}", e);
                None
            }
        })
    });

    let mut shutdown = state.shutdown.clone();
    let stopped = async move {
        let _ = shutdown.wait_for(|&stop| stop).await;
    };

    let stream = stream::select(events, drawings)
        .map(|event| Ok(event.to_sse()))
        .take_until(stopped);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.settings.keepalive)
            .text("ping"),
    )
}
