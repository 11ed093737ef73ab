use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

pub mod auth;
pub mod concerts;
pub mod feed;
pub mod friends;
pub mod notifications;
pub mod search;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "concertcircle-api",
    };

    success(payload, "Health check successful")
}
