use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{ports::TokenStream, DomainError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

// Serialized JSON never contains raw newlines, so it is always a valid data line.
fn event(name: Option<&str>, payload: serde_json::Value) -> Event {
    let event = Event::default().data(payload.to_string());
    match name {
        Some(name) => event.event(name),
        None => event,
    }
}

fn content_event(fragment: &str) -> Event {
    event(None, json!({ "content": fragment }))
}

fn error_event(err: &DomainError) -> Event {
    event(
        Some("error"),
        json!({ "error": "Agent error", "detail": err.to_string() }),
    )
}

fn done_event(session_id: &str) -> Event {
    event(Some("done"), json!({ "session_id": session_id }))
}

/// Streams the reply as server-sent events: `session`, then content
/// fragments, then `done` or `error`.
pub async fn chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(request) = payload?;
    let run = state
        .agent
        .run_stream(&request.message, request.session_id)
        .await?;

    let session = event(
        Some("session"),
        json!({ "session_id": run.session_id, "new_session": run.new_session }),
    );
    let session_id = run.session_id;

    let body = stream::unfold(Some(run.tokens), move |tokens: Option<TokenStream>| {
        let session_id = session_id.clone();
        async move {
            let mut tokens = tokens?;
            match tokens.next().await {
                Some(Ok(fragment)) => Some((content_event(&fragment), Some(tokens))),
                Some(Err(e)) => Some((error_event(&e), None)),
                None => Some((done_event(&session_id), None)),
            }
        }
    });

    let events = stream::once(async move { session })
        .chain(body)
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
