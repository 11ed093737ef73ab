use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{EventSource, SearchError, WpEvent};

const USER_AGENT: &str = "ConcertCircle/1.0";
const PER_PAGE: &str = "15";
const FIELDS: &str = "id,title,link,content,acf";

/// WordPress REST client for the pop-agenda.nl events collection.
#[derive(Clone)]
pub struct PopAgendaClient {
    http: Client,
    endpoint: String,
}

impl PopAgendaClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SearchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl EventSource for PopAgendaClient {
    async fn search(&self, query: &str) -> Result<Vec<WpEvent>, SearchError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("search", query),
                ("per_page", PER_PAGE),
                ("status", "publish"),
                ("_fields", FIELDS),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status));
        }

        let events = response.json::<Vec<WpEvent>>().await?;
        debug!(query, count = events.len(), "Search: upstream returned events");
        Ok(events)
    }
}
