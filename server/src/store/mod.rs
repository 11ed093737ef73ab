//! Row storage. Every persistence call the service makes goes through
//! [`Store`]; [`PgStore`] is the production backend and [`MemoryStore`]
//! backs the tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Concert, ConcertDraft, ConcertStatus, Friendship, FriendshipStatus, NewProfile, Notification,
    User, UserConcert,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// SQLSTATE raised by Postgres for unique constraint violations.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Backend(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db) = err.as_database_error() {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::UniqueViolation(db.message().to_string());
            }
        }
        StoreError::Backend(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One accepted friend's marking on an upcoming concert, joined with
/// everything the feed shows about it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub concert: Concert,
    pub friend: User,
    pub friend_status: ConcertStatus,
    pub my_status: Option<ConcertStatus>,
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Creates the profile row, or refreshes the email of an existing one
    /// while keeping any display name and avatar already set.
    async fn upsert_profile(&self, profile: &NewProfile) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Exact match against an already normalized address.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// All concerts, earliest date first.
    async fn list_concerts(&self) -> StoreResult<Vec<Concert>>;
    async fn get_concert(&self, id: Uuid) -> StoreResult<Option<Concert>>;
    async fn insert_concert(&self, created_by: Uuid, draft: &ConcertDraft) -> StoreResult<Concert>;
    async fn update_concert(&self, id: Uuid, draft: &ConcertDraft)
        -> StoreResult<Option<Concert>>;
    async fn delete_concert(&self, id: Uuid) -> StoreResult<bool>;

    async fn user_concert(&self, user_id: Uuid, concert_id: Uuid)
        -> StoreResult<Option<UserConcert>>;
    async fn user_concerts_for(&self, user_id: Uuid) -> StoreResult<Vec<UserConcert>>;
    /// Markings by any of `user_ids` on any of `concert_ids`.
    async fn marks_on(
        &self,
        user_ids: &[Uuid],
        concert_ids: &[Uuid],
    ) -> StoreResult<Vec<UserConcert>>;
    /// Inserts the marking or replaces the status of the existing one; there
    /// is never more than one row per (user, concert).
    async fn upsert_user_concert(
        &self,
        user_id: Uuid,
        concert_id: Uuid,
        status: ConcertStatus,
    ) -> StoreResult<UserConcert>;
    async fn delete_user_concert(&self, user_id: Uuid, concert_id: Uuid) -> StoreResult<bool>;

    /// Friendships where the user is on either side.
    async fn friendships_for(&self, user_id: Uuid) -> StoreResult<Vec<Friendship>>;
    async fn accepted_friend_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;
    async fn get_friendship(&self, id: Uuid) -> StoreResult<Option<Friendship>>;
    /// Inserts a pending request. A second request for the same pair fails
    /// with [`StoreError::UniqueViolation`].
    async fn insert_friendship(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<Friendship>;
    async fn set_friendship_status(
        &self,
        id: Uuid,
        status: FriendshipStatus,
    ) -> StoreResult<Option<Friendship>>;
    async fn delete_friendship(&self, id: Uuid) -> StoreResult<bool>;

    /// Accepted friends' markings on concerts dated `today` or later,
    /// ordered by concert date.
    async fn feed_rows(&self, user_id: Uuid, today: NaiveDate) -> StoreResult<Vec<FeedRow>>;
    /// Concerts the user has marked, dated `today` or later, earliest first.
    async fn upcoming_marked(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        limit: i64,
    ) -> StoreResult<Vec<Concert>>;

    /// Newest first.
    async fn notifications_for(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;
    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64>;
    async fn unread_count(&self, user_id: Uuid) -> StoreResult<i64>;
}
