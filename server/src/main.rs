use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

use concertcircle_server::auth::GoTrueClient;
use concertcircle_server::config::Config;
use concertcircle_server::realtime::NotificationHub;
use concertcircle_server::routes::create_routes;
use concertcircle_server::search::PopAgendaClient;
use concertcircle_server::state::AppState;
use concertcircle_server::store::PgStore;

const DEFAULT_LOG_FILTER: &str = "info,concertcircle_server=debug";

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    info!("Migrations run successfully");

    let hub = NotificationHub::default();
    let store = PgStore::new(pool);
    {
        let store = store.clone();
        let hub = hub.clone();
        tokio::spawn(async move { store.forward_notification_changes(hub).await });
    }

    let auth = GoTrueClient::new(&config.auth).expect("Failed to build auth client");
    let events =
        PopAgendaClient::new(config.events_api_url.clone()).expect("Failed to build events client");

    let addr = config.bind_addr;
    let state = AppState::new(
        config,
        Arc::new(store),
        Arc::new(auth),
        Arc::new(events),
        hub,
    );
    let app: Router = create_routes(state);

    info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");

    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
