use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How a user has marked a concert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "concert_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConcertStatus {
    Going,
    Interested,
}

impl ConcertStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConcertStatus::Going => "going",
            ConcertStatus::Interested => "interested",
        }
    }
}

impl fmt::Display for ConcertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserConcert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub concert_id: Uuid,
    pub status: ConcertStatus,
    pub created_at: DateTime<Utc>,
}
