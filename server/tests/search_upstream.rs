use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::json;
use tokio::net::TcpListener;

use concertcircle_server::search::{search_concerts, EventSource, PopAgendaClient, SearchError};

async fn events(Query(params): Query<HashMap<String, String>>) -> Response {
    let expected = [
        ("search", "dotan"),
        ("per_page", "15"),
        ("status", "publish"),
        ("_fields", "id,title,link,content,acf"),
    ];
    if expected
        .iter()
        .any(|(k, v)| params.get(*k).map(String::as_str) != Some(*v))
    {
        return StatusCode::BAD_REQUEST.into_response();
    }

    Json(json!([
        {
            "id": 101,
            "title": { "rendered": "Dotan" },
            "link": "https://www.pop-agenda.nl/events/dotan",
            "content": { "rendered": "<a class=\"wp-block-button__link\" href=\"https://tickets.example/dotan\">Tickets</a>" },
            "acf": { "eventdate": "20260320", "venue": "Ziggo Dome", "city": "Amsterdam", "ticketprice": 55 }
        },
        {
            "id": 102,
            "title": { "rendered": "Dotan" },
            "link": "https://www.pop-agenda.nl/events/dotan-old",
            "content": { "rendered": "" },
            "acf": { "eventdate": "20250101" }
        }
    ]))
    .into_response()
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/events", get(events))
        .route("/broken", get(broken))
        .route("/garbage", get(|| async { "<html>not json</html>" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

#[tokio::test]
async fn queries_upstream_and_normalizes() {
    let addr = spawn_upstream().await;
    let client = PopAgendaClient::new(format!("http://{addr}/events")).unwrap();

    let results = search_concerts(&client, "  dotan ", today()).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 101);
    assert_eq!(results[0].title, "Dotan – Ziggo Dome");
    assert_eq!(results[0].location, "Ziggo Dome, Amsterdam");
    assert_eq!(results[0].date, "2026-03-20");
    assert_eq!(results[0].ticket_url, "https://tickets.example/dotan");
    assert_eq!(results[0].price, Some(55.0));
}

#[tokio::test]
async fn upstream_error_status_is_reported_then_swallowed() {
    let addr = spawn_upstream().await;
    let client = PopAgendaClient::new(format!("http://{addr}/broken")).unwrap();

    let err = client.search("dotan").await.unwrap_err();
    assert!(matches!(err, SearchError::Status(s) if s == reqwest::StatusCode::INTERNAL_SERVER_ERROR));
    assert!(search_concerts(&client, "dotan", today()).await.is_empty());
}

#[tokio::test]
async fn undecodable_body_yields_no_results() {
    let addr = spawn_upstream().await;
    let client = PopAgendaClient::new(format!("http://{addr}/garbage")).unwrap();

    assert!(matches!(
        client.search("dotan").await,
        Err(SearchError::Request(_))
    ));
    assert!(search_concerts(&client, "dotan", today()).await.is_empty());
}

#[tokio::test]
async fn unreachable_upstream_yields_no_results() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = PopAgendaClient::new(format!("http://{addr}/events")).unwrap();
    assert!(search_concerts(&client, "dotan", today()).await.is_empty());
}
