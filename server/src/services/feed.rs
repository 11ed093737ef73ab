use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Concert, ConcertStatus, User};
use crate::store::Store;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendMark {
    pub user: User,
    pub status: ConcertStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub concert: Concert,
    pub my_status: Option<ConcertStatus>,
    pub friend_signs: Vec<FriendMark>,
}

/// Upcoming concerts that at least one accepted friend has marked, in date
/// order, each with every friend's marking.
pub async fn feed(
    store: &dyn Store,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<FeedItem>, AppError> {
    let rows = store.feed_rows(user_id, today).await?;

    let mut items: Vec<FeedItem> = Vec::new();
    for row in rows {
        let mark = FriendMark {
            user: row.friend,
            status: row.friend_status,
        };
        match items.iter_mut().find(|item| item.concert.id == row.concert.id) {
            Some(item) => item.friend_signs.push(mark),
            None => items.push(FeedItem {
                concert: row.concert,
                my_status: row.my_status,
                friend_signs: vec![mark],
            }),
        }
    }

    Ok(items)
}
