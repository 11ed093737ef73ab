use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub payload: Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// One-line, human readable rendering of the payload.
    pub fn summary(&self) -> String {
        let field = |key: &str| match self.payload.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        match self.kind.as_str() {
            "friend_request" => format!(
                "{} sent you a friend request.",
                field("from_name").unwrap_or_else(|| "Someone".to_string())
            ),
            "friend_accepted" => format!(
                "{} accepted your friend request.",
                field("from_name").unwrap_or_else(|| "Someone".to_string())
            ),
            "concert_match" => format!(
                "{} is also {} for {} – {}.",
                if field("actor_id").is_some() {
                    "A friend"
                } else {
                    "Someone"
                },
                field("actor_status").unwrap_or_default(),
                field("concert_artist").unwrap_or_default(),
                field("concert_title").unwrap_or_default(),
            ),
            _ => self.payload.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(kind: &str, payload: Value) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: kind.to_string(),
            payload,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summaries_by_kind() {
        assert_eq!(
            notification("friend_request", json!({ "from_name": "Jane" })).summary(),
            "Jane sent you a friend request."
        );
        assert_eq!(
            notification("friend_accepted", json!({})).summary(),
            "Someone accepted your friend request."
        );
        assert_eq!(
            notification(
                "concert_match",
                json!({
                    "actor_id": "9f1c",
                    "actor_status": "going",
                    "concert_artist": "Dotan",
                    "concert_title": "Dotan – TivoliVredenburg"
                })
            )
            .summary(),
            "A friend is also going for Dotan – Dotan – TivoliVredenburg."
        );
        assert_eq!(
            notification("system", json!({ "text": "hi" })).summary(),
            r#"{"text":"hi"}"#
        );
    }

    #[test]
    fn kind_serializes_as_type() {
        let value = serde_json::to_value(notification("friend_request", json!({}))).unwrap();
        assert_eq!(value["type"], "friend_request");
        assert!(value.get("kind").is_none());
    }
}
