use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use futures::{Stream, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::realtime::unread_counts;
use crate::services::notifications;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Path;
use crate::utils::response::{empty_success, success};

/// SSE event name carrying the unread count.
pub const UNREAD_EVENT: &str = "unread";

#[derive(Serialize)]
struct ReadAllPayload {
    updated: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let items = notifications::list(state.store.as_ref(), user.id).await?;
    Ok(success(items, "Notifications retrieved"))
}

pub async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let count = notifications::unread_count(state.store.as_ref(), user.id).await?;
    Ok(success(count, "Unread count retrieved"))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let updated = notifications::mark_all_read(state.store.as_ref(), user.id).await?;
    Ok(success(ReadAllPayload { updated }, "All notifications marked as read"))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    notifications::mark_read(state.store.as_ref(), user.id, id).await?;
    Ok(empty_success("Notification marked as read"))
}

/// Live unread count. Failed refreshes are skipped; the next change retries.
pub async fn stream_unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = unread_counts(state.store.clone(), &state.hub, user.id).filter_map(
        |count| async move {
            count
                .ok()
                .map(|count| Ok(Event::default().event(UNREAD_EVENT).data(count.to_string())))
        },
    );

    Sse::new(events).keep_alive(KeepAlive::default())
}
