//! Concert search against the public pop-agenda.nl events API.
//!
//! Upstream trouble never reaches the caller: a failed or unreadable
//! response is logged and turned into an empty candidate list.

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub mod pop_agenda;

pub use pop_agenda::PopAgendaClient;

static BUTTON_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"class="wp-block-button__link[^"]*"[^>]*href="([^"]+)""#)
        .expect("valid button link regex")
});

static TICKETISH_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(https?://[^"]*(?:ticket|agenda|koop|bestel)[^"]*)""#)
        .expect("valid ticket link regex")
});

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// One event as the WordPress REST API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct WpEvent {
    pub id: i64,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub content: Rendered,
    /// Custom fields. WordPress sends `false` or `[]` here when none are set,
    /// so this stays loosely typed.
    #[serde(default)]
    pub acf: Value,
}

impl WpEvent {
    fn acf_str(&self, key: &str) -> Option<&str> {
        self.acf.get(key).and_then(Value::as_str)
    }

    fn acf_price(&self) -> Option<f64> {
        match self.acf.get("ticketprice")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }
}

/// A normalized search hit, ready to prefill the concert form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcertResult {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub ticket_url: String,
    pub source_url: String,
    pub genres: String,
    pub price: Option<f64>,
    pub sold_out: bool,
    pub canceled: bool,
}

#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    async fn search(&self, query: &str) -> Result<Vec<WpEvent>, SearchError>;
}

/// `YYYYMMDD` to `YYYY-MM-DD`; anything not eight characters long maps to
/// an empty string.
pub fn parse_event_date(raw: &str) -> String {
    if raw.len() != 8 || !raw.is_ascii() {
        return String::new();
    }
    format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
}

/// The ticket link inside the event body: the block button if there is one,
/// otherwise the first external link that looks like a ticket shop.
pub fn extract_ticket_url(html: &str) -> String {
    BUTTON_LINK_RE
        .captures(html)
        .or_else(|| TICKETISH_LINK_RE.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Keeps events on or after `today` and reshapes them.
pub fn normalize(events: Vec<WpEvent>, today: NaiveDate) -> Vec<ConcertResult> {
    let today = today.format("%Y%m%d").to_string();

    events
        .into_iter()
        .filter(|e| e.acf_str("eventdate").unwrap_or("0") >= today.as_str())
        .map(|e| {
            let venue = e.acf_str("venue").unwrap_or_default();
            let location = [venue, e.acf_str("city").unwrap_or_default()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(", ");

            ConcertResult {
                id: e.id,
                title: format!("{} – {}", e.title.rendered, venue),
                artist: e.title.rendered.clone(),
                location,
                date: parse_event_date(e.acf_str("eventdate").unwrap_or_default()),
                time: e.acf_str("eventtime").unwrap_or_default().to_string(),
                ticket_url: extract_ticket_url(&e.content.rendered),
                source_url: e.link.clone(),
                genres: e.acf_str("genres").unwrap_or_default().to_string(),
                price: e.acf_price(),
                sold_out: e.acf_str("soldout") == Some("true"),
                canceled: e.acf_str("canceled") == Some("true"),
            }
        })
        .collect()
}

/// Searches upstream and normalizes. Blank queries skip the upstream call;
/// upstream failures yield an empty list.
pub async fn search_concerts(
    source: &dyn EventSource,
    query: &str,
    today: NaiveDate,
) -> Vec<ConcertResult> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    match source.search(query).await {
        Ok(events) => normalize(events, today),
        Err(e) => {
            warn!(error = %e, query, "Search: upstream failed, returning no results");
            Vec::new()
        }
    }
}
