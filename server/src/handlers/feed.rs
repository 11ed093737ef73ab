use axum::extract::State;
use axum::response::Response;
use chrono::Utc;

use crate::auth::CurrentUser;
use crate::services::feed;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn get_feed(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let items = feed::feed(state.store.as_ref(), user.id, Utc::now().date_naive()).await?;
    Ok(success(items, "Feed retrieved"))
}
