use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "friendship_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Declined,
}

/// A directed invite from `user_id` to `friend_id`. Once accepted it is
/// treated as mutual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Friendship {
    pub id: Uuid,
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.friend_id == user_id
    }

    /// The id on the other side of the edge, seen from `me`.
    pub fn other_party(&self, me: Uuid) -> Uuid {
        if self.user_id == me {
            self.friend_id
        } else {
            self.user_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_party_normalizes_direction() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let edge = Friendship {
            id: Uuid::new_v4(),
            user_id: a,
            friend_id: b,
            status: FriendshipStatus::Accepted,
            created_at: Utc::now(),
        };
        assert_eq!(edge.other_party(a), b);
        assert_eq!(edge.other_party(b), a);
        assert!(edge.involves(a) && edge.involves(b));
        assert!(!edge.involves(Uuid::new_v4()));
    }
}
