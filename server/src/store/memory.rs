use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{FeedRow, Store, StoreError, StoreResult};
use crate::models::{
    Concert, ConcertDraft, ConcertStatus, Friendship, FriendshipStatus, NewProfile, Notification,
    User, UserConcert,
};
use crate::realtime::NotificationHub;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    concerts: Vec<Concert>,
    user_concerts: Vec<UserConcert>,
    friendships: Vec<Friendship>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn accepted_friend_ids(&self, user_id: Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.friendships
            .iter()
            .filter(|f| f.status == FriendshipStatus::Accepted && f.involves(user_id))
            .map(|f| f.other_party(user_id))
            .filter(|id| *id != user_id && seen.insert(*id))
            .collect()
    }

    fn status_of(&self, user_id: Uuid, concert_id: Uuid) -> Option<ConcertStatus> {
        self.user_concerts
            .iter()
            .find(|uc| uc.user_id == user_id && uc.concert_id == concert_id)
            .map(|uc| uc.status)
    }
}

/// In-process [`Store`] with the same constraints as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    hub: Option<NotificationHub>,
}

impl MemoryStore {
    /// A store that announces notification changes on `hub`, as the
    /// Postgres trigger does.
    pub fn with_hub(hub: NotificationHub) -> Self {
        Self {
            tables: Mutex::default(),
            hub: Some(hub),
        }
    }

    fn announce(&self, user_id: Uuid) {
        if let Some(hub) = &self.hub {
            hub.publish(user_id);
        }
    }

    pub async fn seed_user(&self, email: &str, display_name: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            display_name: display_name.map(str::to_string),
            email: Some(email.to_string()),
            avatar_url: None,
        };
        self.tables.lock().await.users.push(user.clone());
        user
    }

    pub async fn seed_notification(&self, user_id: Uuid, kind: &str, payload: Value) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            kind: kind.to_string(),
            payload,
            is_read: false,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .await
            .notifications
            .push(notification.clone());
        self.announce(user_id);
        notification
    }

    pub async fn user_concert_rows(&self) -> Vec<UserConcert> {
        self.tables.lock().await.user_concerts.clone()
    }

    pub async fn friendship_rows(&self) -> Vec<Friendship> {
        self.tables.lock().await.friendships.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_profile(&self, profile: &NewProfile) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == profile.id) {
            if profile.email.is_some() {
                user.email = profile.email.clone();
            }
            if user.display_name.is_none() {
                user.display_name = profile.display_name.clone();
            }
            if user.avatar_url.is_none() {
                user.avatar_url = profile.avatar_url.clone();
            }
            return Ok(user.clone());
        }

        let user = User {
            id: profile.id,
            created_at: Utc::now(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
            avatar_url: profile.avatar_url.clone(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_concerts(&self) -> StoreResult<Vec<Concert>> {
        let tables = self.tables.lock().await;
        let mut concerts = tables.concerts.clone();
        concerts.sort_by_key(|c| (c.date, c.created_at));
        Ok(concerts)
    }

    async fn get_concert(&self, id: Uuid) -> StoreResult<Option<Concert>> {
        let tables = self.tables.lock().await;
        Ok(tables.concerts.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_concert(&self, created_by: Uuid, draft: &ConcertDraft) -> StoreResult<Concert> {
        let concert = Concert {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            artist: draft.artist.clone(),
            location: draft.location.clone(),
            date: draft.date,
            ticket_url: draft.ticket_url.clone(),
            source_url: draft.source_url.clone(),
            created_by,
            created_at: Utc::now(),
        };
        self.tables.lock().await.concerts.push(concert.clone());
        Ok(concert)
    }

    async fn update_concert(
        &self,
        id: Uuid,
        draft: &ConcertDraft,
    ) -> StoreResult<Option<Concert>> {
        let mut tables = self.tables.lock().await;
        let Some(concert) = tables.concerts.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        concert.title = draft.title.clone();
        concert.artist = draft.artist.clone();
        concert.location = draft.location.clone();
        concert.date = draft.date;
        concert.ticket_url = draft.ticket_url.clone();
        concert.source_url = draft.source_url.clone();
        Ok(Some(concert.clone()))
    }

    async fn delete_concert(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.concerts.len();
        tables.concerts.retain(|c| c.id != id);
        let removed = tables.concerts.len() < before;
        if removed {
            tables.user_concerts.retain(|uc| uc.concert_id != id);
        }
        Ok(removed)
    }

    async fn user_concert(
        &self,
        user_id: Uuid,
        concert_id: Uuid,
    ) -> StoreResult<Option<UserConcert>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .user_concerts
            .iter()
            .find(|uc| uc.user_id == user_id && uc.concert_id == concert_id)
            .cloned())
    }

    async fn user_concerts_for(&self, user_id: Uuid) -> StoreResult<Vec<UserConcert>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .user_concerts
            .iter()
            .filter(|uc| uc.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn marks_on(
        &self,
        user_ids: &[Uuid],
        concert_ids: &[Uuid],
    ) -> StoreResult<Vec<UserConcert>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .user_concerts
            .iter()
            .filter(|uc| user_ids.contains(&uc.user_id) && concert_ids.contains(&uc.concert_id))
            .cloned()
            .collect())
    }

    async fn upsert_user_concert(
        &self,
        user_id: Uuid,
        concert_id: Uuid,
        status: ConcertStatus,
    ) -> StoreResult<UserConcert> {
        let mut tables = self.tables.lock().await;
        if let Some(row) = tables
            .user_concerts
            .iter_mut()
            .find(|uc| uc.user_id == user_id && uc.concert_id == concert_id)
        {
            row.status = status;
            return Ok(row.clone());
        }

        let row = UserConcert {
            id: Uuid::new_v4(),
            user_id,
            concert_id,
            status,
            created_at: Utc::now(),
        };
        tables.user_concerts.push(row.clone());
        Ok(row)
    }

    async fn delete_user_concert(&self, user_id: Uuid, concert_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.user_concerts.len();
        tables
            .user_concerts
            .retain(|uc| !(uc.user_id == user_id && uc.concert_id == concert_id));
        Ok(tables.user_concerts.len() < before)
    }

    async fn friendships_for(&self, user_id: Uuid) -> StoreResult<Vec<Friendship>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .friendships
            .iter()
            .filter(|f| f.involves(user_id))
            .cloned()
            .collect())
    }

    async fn accepted_friend_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self.tables.lock().await.accepted_friend_ids(user_id))
    }

    async fn get_friendship(&self, id: Uuid) -> StoreResult<Option<Friendship>> {
        let tables = self.tables.lock().await;
        Ok(tables.friendships.iter().find(|f| f.id == id).cloned())
    }

    async fn insert_friendship(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<Friendship> {
        let mut tables = self.tables.lock().await;
        if tables
            .friendships
            .iter()
            .any(|f| f.user_id == user_id && f.friend_id == friend_id)
        {
            return Err(StoreError::UniqueViolation(
                "duplicate key value violates unique constraint \"friendships_user_id_friend_id_key\""
                    .to_string(),
            ));
        }

        let row = Friendship {
            id: Uuid::new_v4(),
            user_id,
            friend_id,
            status: FriendshipStatus::Pending,
            created_at: Utc::now(),
        };
        tables.friendships.push(row.clone());
        Ok(row)
    }

    async fn set_friendship_status(
        &self,
        id: Uuid,
        status: FriendshipStatus,
    ) -> StoreResult<Option<Friendship>> {
        let mut tables = self.tables.lock().await;
        let Some(row) = tables.friendships.iter_mut().find(|f| f.id == id) else {
            return Ok(None);
        };
        row.status = status;
        Ok(Some(row.clone()))
    }

    async fn delete_friendship(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.friendships.len();
        tables.friendships.retain(|f| f.id != id);
        Ok(tables.friendships.len() < before)
    }

    async fn feed_rows(&self, user_id: Uuid, today: NaiveDate) -> StoreResult<Vec<FeedRow>> {
        let tables = self.tables.lock().await;
        let friend_ids = tables.accepted_friend_ids(user_id);

        let mut rows: Vec<FeedRow> = tables
            .user_concerts
            .iter()
            .filter(|uc| friend_ids.contains(&uc.user_id))
            .filter_map(|uc| {
                let concert = tables
                    .concerts
                    .iter()
                    .find(|c| c.id == uc.concert_id && c.date >= today)?;
                let friend = tables.users.iter().find(|u| u.id == uc.user_id)?;
                Some(FeedRow {
                    concert: concert.clone(),
                    friend: friend.clone(),
                    friend_status: uc.status,
                    my_status: tables.status_of(user_id, concert.id),
                })
            })
            .collect();

        rows.sort_by_key(|row| (row.concert.date, row.concert.id));
        Ok(rows)
    }

    async fn upcoming_marked(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        limit: i64,
    ) -> StoreResult<Vec<Concert>> {
        let tables = self.tables.lock().await;
        let mut concerts: Vec<Concert> = tables
            .concerts
            .iter()
            .filter(|c| c.date >= today && tables.status_of(user_id, c.id).is_some())
            .cloned()
            .collect();
        concerts.sort_by_key(|c| c.date);
        concerts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(concerts)
    }

    async fn notifications_for(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(row) = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        else {
            return Ok(false);
        };
        row.is_read = true;
        drop(tables);
        self.announce(user_id);
        Ok(true)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut updated = 0;
        for row in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            row.is_read = true;
            updated += 1;
        }
        drop(tables);
        if updated > 0 {
            self.announce(user_id);
        }
        Ok(updated)
    }

    async fn unread_count(&self, user_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count();
        Ok(count as i64)
    }
}
