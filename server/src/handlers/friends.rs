use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::services::friends;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path};
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub accept: bool,
}

pub async fn list_friends(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let overview = friends::list(state.store.as_ref(), user.id).await?;
    Ok(success(overview, "Friends retrieved"))
}

pub async fn invite(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<InviteRequest>,
) -> Result<Response, AppError> {
    let invite = friends::invite(state.store.as_ref(), user.id, &body.email).await?;
    Ok(created(invite.friendship, invite.message))
}

pub async fn respond(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RespondRequest>,
) -> Result<Response, AppError> {
    let friendship = friends::respond(state.store.as_ref(), user.id, id, body.accept).await?;
    let message = if body.accept {
        "Friend request accepted"
    } else {
        "Friend request declined"
    };
    Ok(success(friendship, message))
}

pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    friends::remove(state.store.as_ref(), user.id, id).await?;
    Ok(empty_success("Friend removed"))
}
