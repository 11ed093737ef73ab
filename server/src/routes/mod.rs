use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, concerts, feed, friends, health_check, notifications, search};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let cors = create_cors_layer(&state.config.cors_allowed_origins);
    let security = create_security_headers_layer(state.config.production);

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes())
        .route(
            "/concerts",
            get(concerts::list_concerts).post(concerts::create_concert),
        )
        .route(
            "/concerts/:id",
            put(concerts::update_concert).delete(concerts::delete_concert),
        )
        .route("/concerts/:id/status", put(concerts::toggle_status))
        .route("/dashboard", get(concerts::dashboard))
        .route("/friends", get(friends::list_friends))
        .route("/friends/invite", post(friends::invite))
        .route("/friends/:id/respond", post(friends::respond))
        .route("/friends/:id", delete(friends::remove))
        .route("/feed", get(feed::get_feed))
        .nest("/notifications", notification_routes())
        .route("/api/search-concerts", get(search::search))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(security)
        .layer(cors)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::sign_up))
        .route("/signin", post(auth::sign_in))
        .route("/oauth/:provider", get(auth::oauth_redirect))
        .route("/session", get(auth::session))
        .route("/signout", post(auth::sign_out))
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/:id/read", post(notifications::mark_read))
        .route("/stream", get(notifications::stream_unread_count))
}
