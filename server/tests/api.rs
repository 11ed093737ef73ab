use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use concertcircle_server::auth::{AuthError, AuthProvider, AuthUser, OAuthProvider, Session, SignUp};
use concertcircle_server::config::{AuthConfig, Config};
use concertcircle_server::realtime::NotificationHub;
use concertcircle_server::routes::create_routes;
use concertcircle_server::search::{EventSource, SearchError, WpEvent};
use concertcircle_server::state::AppState;
use concertcircle_server::store::{MemoryStore, Store};

/// Tokens are the users' emails; the password is always "secret".
#[derive(Default)]
struct FakeAuth {
    users: Mutex<HashMap<String, AuthUser>>,
}

impl FakeAuth {
    fn add(&self, user: AuthUser) {
        let email = user.email.clone().unwrap_or_default();
        self.users.lock().unwrap().insert(email, user);
    }

    fn session_for(user: AuthUser) -> Session {
        Session {
            access_token: user.email.clone().unwrap_or_default(),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            refresh_token: "refresh".to_string(),
            user,
        }
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        display_name: &str,
    ) -> Result<SignUp, AuthError> {
        if self.users.lock().unwrap().contains_key(email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: json!({ "full_name": display_name }),
        };
        self.add(user.clone());
        Ok(SignUp { user, session: None })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.users.lock().unwrap().get(email).cloned();
        match user {
            Some(user) if password == "secret" => Ok(Self::session_for(user)),
            _ => Err(AuthError::Rejected("Invalid login credentials".to_string())),
        }
    }

    fn authorize_url(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        Ok(format!(
            "https://auth.test/authorize?provider={}",
            provider.as_str()
        ))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        self.users
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| AuthError::Rejected("invalid JWT".to_string()))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Always fails, but remembers what it was asked.
#[derive(Default)]
struct DownEvents {
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl EventSource for DownEvents {
    async fn search(&self, query: &str) -> Result<Vec<WpEvent>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        Err(SearchError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    auth: Arc<FakeAuth>,
    events: Arc<DownEvents>,
}

impl TestApp {
    fn new() -> Self {
        let config = Config {
            database_url: "postgres://unused".to_string(),
            database_max_connections: 1,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            auth: AuthConfig {
                url: "http://auth.test".to_string(),
                anon_key: "anon".to_string(),
                redirect_url: "http://localhost:3000/auth/callback".to_string(),
            },
            events_api_url: "http://events.test".to_string(),
            cors_allowed_origins: "http://localhost:3000".to_string(),
            production: false,
        };
        let hub = NotificationHub::default();
        let store = Arc::new(MemoryStore::with_hub(hub.clone()));
        let auth = Arc::new(FakeAuth::default());
        let events = Arc::new(DownEvents::default());
        let state = AppState::new(
            config,
            store.clone() as Arc<dyn Store>,
            auth.clone() as Arc<dyn AuthProvider>,
            events.clone() as Arc<dyn EventSource>,
            hub,
        );

        Self {
            router: create_routes(state),
            store,
            auth,
            events,
        }
    }

    /// Registers a user with the auth provider and a profile row. Returns the
    /// bearer token.
    async fn user(&self, email: &str, name: &str) -> (String, Uuid) {
        let profile = self.store.seed_user(email, Some(name)).await;
        self.auth.add(AuthUser {
            id: profile.id,
            email: Some(email.to_string()),
            user_metadata: json!({ "full_name": name }),
        });
        (email.to_string(), profile.id)
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn in_days(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

#[tokio::test]
async fn health_check_reports_service() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["service"], "concertcircle-api");
}

#[tokio::test]
async fn search_degrades_to_empty_array() {
    let app = TestApp::new();

    let (status, body) = app
        .send("GET", "/api/search-concerts?q=dotan", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app.send("GET", "/api/search-concerts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn search_with_repeated_q_uses_the_first() {
    let app = TestApp::new();

    let (status, body) = app
        .send("GET", "/api/search-concerts?q=dotan&q=other", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(*app.events.queries.lock().unwrap(), vec!["dotan".to_string()]);
}

#[tokio::test]
async fn malformed_input_gets_the_error_envelope() {
    let app = TestApp::new();
    let (ann, _) = app.user("ann@example.com", "Ann").await;

    let (status, body) = app
        .send("POST", "/concerts", Some(&ann), Some(json!({ "title": "No date" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send("DELETE", "/concerts/not-a-uuid", Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send("GET", "/concerts?filter=everything", Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/feed", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = app.send("GET", "/feed", Some("nobody"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_in_relays_provider_message_and_syncs_profile() {
    let app = TestApp::new();
    let id = Uuid::new_v4();
    app.auth.add(AuthUser {
        id,
        email: Some("jane@example.com".to_string()),
        user_metadata: json!({ "name": "Jane Smith" }),
    });

    let (status, body) = app
        .send(
            "POST",
            "/auth/signin",
            None,
            Some(json!({ "email": "jane@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid login credentials");

    let (status, body) = app
        .send(
            "POST",
            "/auth/signin",
            None,
            Some(json!({ "email": "jane@example.com", "password": "secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["profile"]["display_name"], "Jane Smith");

    let profile = app.store.find_user(id).await.unwrap().unwrap();
    assert_eq!(profile.email.as_deref(), Some("jane@example.com"));
}

#[tokio::test]
async fn sign_up_without_session_asks_for_confirmation() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "new@example.com", "password": "secret", "display_name": "New" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Check your email to confirm your account");
    assert!(body["data"]["session"].is_null());
    assert_eq!(body["data"]["profile"]["display_name"], "New");

    let (status, body) = app
        .send(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "new@example.com", "password": "secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "User already registered");
}

#[tokio::test]
async fn oauth_redirects_to_provider() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/auth/oauth/google")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[LOCATION],
        "https://auth.test/authorize?provider=google"
    );

    let (status, _) = app.send("GET", "/auth/oauth/myspace", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn toggling_the_same_status_twice_clears_it() {
    let app = TestApp::new();
    let (ann, _) = app.user("ann@example.com", "Ann").await;

    let (status, body) = app
        .send(
            "POST",
            "/concerts",
            Some(&ann),
            Some(json!({
                "title": "Dotan – TivoliVredenburg",
                "artist": "Dotan",
                "location": "TivoliVredenburg, Utrecht",
                "date": in_days(10),
                "ticket_url": ""
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["ticket_url"].is_null());
    let concert_id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/concerts/{concert_id}/status");

    let (_, body) = app
        .send("PUT", &uri, Some(&ann), Some(json!({ "status": "going" })))
        .await;
    assert_eq!(body["data"]["status"], "going");

    let (_, body) = app
        .send("PUT", &uri, Some(&ann), Some(json!({ "status": "going" })))
        .await;
    assert!(body["data"]["status"].is_null());
    assert!(app.store.user_concert_rows().await.is_empty());

    let (status, _) = app
        .send(
            "PUT",
            &format!("/concerts/{}/status", Uuid::new_v4()),
            Some(&ann),
            Some(json!({ "status": "going" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_creator_can_delete() {
    let app = TestApp::new();
    let (ann, _) = app.user("ann@example.com", "Ann").await;
    let (bob, _) = app.user("bob@example.com", "Bob").await;

    let (_, body) = app
        .send(
            "POST",
            "/concerts",
            Some(&ann),
            Some(json!({ "title": "T", "artist": "A", "location": "L", "date": in_days(3) })),
        )
        .await;
    let uri = format!("/concerts/{}", body["data"]["id"].as_str().unwrap());

    let (status, body) = app.send("DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = app.send("DELETE", &uri, Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invite_accept_and_see_friend_in_feed() {
    let app = TestApp::new();
    let (ann, _) = app.user("ann@example.com", "Ann").await;
    let (bob, _) = app.user("bob@example.com", "Bob").await;

    let (status, body) = app
        .send("POST", "/friends/invite", Some(&ann), Some(json!({ "email": "nobody@example.com" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"]["message"],
        "No account found with that email address. They must sign up first."
    );

    let (status, body) = app
        .send("POST", "/friends/invite", Some(&ann), Some(json!({ "email": " BOB@example.com" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Invite sent to Bob!");
    let friendship_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send("POST", "/friends/invite", Some(&ann), Some(json!({ "email": "bob@example.com" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"]["message"],
        "You have already sent a request to this person."
    );
    assert_eq!(app.store.friendship_rows().await.len(), 1);

    let (_, body) = app.send("GET", "/friends", Some(&bob), None).await;
    assert_eq!(body["data"]["incoming"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["incoming"][0]["other"]["display_name"], "Ann");

    let (status, _) = app
        .send(
            "POST",
            &format!("/friends/{friendship_id}/respond"),
            Some(&bob),
            Some(json!({ "accept": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(
            "POST",
            "/concerts",
            Some(&ann),
            Some(json!({ "title": "Show", "artist": "Band", "location": "Paradiso", "date": in_days(5) })),
        )
        .await;
    let concert_id = body["data"]["id"].as_str().unwrap().to_string();
    app.send(
        "PUT",
        &format!("/concerts/{concert_id}/status"),
        Some(&ann),
        Some(json!({ "status": "interested" })),
    )
    .await;

    let (status, body) = app.send("GET", "/feed", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["concert"]["id"], concert_id.as_str());
    assert!(items[0]["my_status"].is_null());
    assert_eq!(items[0]["friend_signs"][0]["status"], "interested");
    assert_eq!(items[0]["friend_signs"][0]["user"]["display_name"], "Ann");
}

#[tokio::test]
async fn notifications_read_all_zeroes_count() {
    let app = TestApp::new();
    let (ann, ann_id) = app.user("ann@example.com", "Ann").await;
    app.store
        .seed_notification(ann_id, "friend_request", json!({ "from_name": "Bob" }))
        .await;
    app.store
        .seed_notification(ann_id, "friend_accepted", json!({ "from_name": "Cas" }))
        .await;

    let (_, body) = app
        .send("GET", "/notifications/unread-count", Some(&ann), None)
        .await;
    assert_eq!(body["data"]["count"], 2);

    let (status, body) = app.send("GET", "/notifications", Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .send("POST", "/notifications/read-all", Some(&ann), None)
        .await;
    assert_eq!(body["data"]["updated"], 2);

    let (_, body) = app
        .send("GET", "/notifications/unread-count", Some(&ann), None)
        .await;
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn notification_stream_is_server_sent_events() {
    let app = TestApp::new();
    let (ann, _) = app.user("ann@example.com", "Ann").await;

    let request = Request::builder()
        .uri(format!("/notifications/stream?access_token={ann}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
}
