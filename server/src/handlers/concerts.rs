use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::{ConcertDraft, ConcertStatus};
use crate::services::concerts::{self, ConcertFilter};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path, Query};
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: ConcertFilter,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ConcertStatus,
}

#[derive(Serialize)]
struct StatusPayload {
    concert_id: Uuid,
    status: Option<ConcertStatus>,
}

pub async fn list_concerts(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let concerts = concerts::list(state.store.as_ref(), user.id, query.filter).await?;
    Ok(success(concerts, "Concerts retrieved"))
}

pub async fn create_concert(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<ConcertDraft>,
) -> Result<Response, AppError> {
    let concert = concerts::create(state.store.as_ref(), user.id, draft).await?;
    Ok(created(concert, "Concert added"))
}

pub async fn update_concert(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(draft): Json<ConcertDraft>,
) -> Result<Response, AppError> {
    let concert = concerts::update(state.store.as_ref(), user.id, id, draft).await?;
    Ok(success(concert, "Concert updated"))
}

pub async fn delete_concert(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    concerts::delete(state.store.as_ref(), user.id, id).await?;
    Ok(empty_success("Concert deleted"))
}

pub async fn toggle_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<Response, AppError> {
    let status = concerts::toggle_status(state.store.as_ref(), user.id, id, body.status).await?;
    let message = match status {
        Some(status) => format!("Marked as {status}"),
        None => "Status cleared".to_string(),
    };
    Ok(success(
        StatusPayload {
            concert_id: id,
            status,
        },
        message,
    ))
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let today = Utc::now().date_naive();
    let dashboard = concerts::dashboard(
        state.store.as_ref(),
        user.id,
        user.email.as_deref(),
        today,
    )
    .await?;
    Ok(success(dashboard, "Dashboard retrieved"))
}
