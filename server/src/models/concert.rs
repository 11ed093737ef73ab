use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Concert {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub location: String,
    pub date: NaiveDate,
    pub ticket_url: Option<String>,
    pub source_url: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Fields a user submits when adding or editing a concert.
#[derive(Debug, Clone, Deserialize)]
pub struct ConcertDraft {
    pub title: String,
    pub artist: String,
    pub location: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub ticket_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}
