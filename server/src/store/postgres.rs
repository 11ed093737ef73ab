use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgListener, PgPool};
use sqlx::FromRow;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{FeedRow, Store, StoreResult};
use crate::models::{
    Concert, ConcertDraft, ConcertStatus, Friendship, FriendshipStatus, NewProfile, Notification,
    User, UserConcert,
};
use crate::realtime::{NotificationHub, NOTIFICATIONS_CHANNEL};

const CONCERT_COLUMNS: &str =
    "id, title, artist, location, date, ticket_url, source_url, created_by, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Relays `notifications_changed` events from Postgres into `hub`.
    /// Never returns; a lost listener connection is reopened.
    pub async fn forward_notification_changes(&self, hub: NotificationHub) {
        loop {
            let mut listener = match PgListener::connect_with(&self.pool).await {
                Ok(listener) => listener,
                Err(e) => {
                    warn!(error = ?e, "Realtime: failed to open listener connection");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            if let Err(e) = listener.listen(NOTIFICATIONS_CHANNEL).await {
                warn!(error = ?e, "Realtime: LISTEN failed");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
            info!(channel = NOTIFICATIONS_CHANNEL, "Realtime: listening");

            loop {
                match listener.recv().await {
                    Ok(notification) => match notification.payload().parse::<Uuid>() {
                        Ok(user_id) => hub.publish(user_id),
                        Err(_) => {
                            debug!(payload = notification.payload(), "Realtime: ignoring payload")
                        }
                    },
                    Err(e) => {
                        warn!(error = ?e, "Realtime: listener connection lost");
                        break;
                    }
                }
            }
        }
    }
}

/// Flat shape of one feed row; concert and friend columns are aliased apart.
#[derive(FromRow)]
struct FeedRecord {
    concert_id: Uuid,
    title: String,
    artist: String,
    location: String,
    date: NaiveDate,
    ticket_url: Option<String>,
    source_url: Option<String>,
    created_by: Uuid,
    concert_created_at: DateTime<Utc>,
    friend_id: Uuid,
    friend_created_at: DateTime<Utc>,
    friend_display_name: Option<String>,
    friend_email: Option<String>,
    friend_avatar_url: Option<String>,
    friend_status: ConcertStatus,
    my_status: Option<ConcertStatus>,
}

impl From<FeedRecord> for FeedRow {
    fn from(r: FeedRecord) -> Self {
        FeedRow {
            concert: Concert {
                id: r.concert_id,
                title: r.title,
                artist: r.artist,
                location: r.location,
                date: r.date,
                ticket_url: r.ticket_url,
                source_url: r.source_url,
                created_by: r.created_by,
                created_at: r.concert_created_at,
            },
            friend: User {
                id: r.friend_id,
                created_at: r.friend_created_at,
                display_name: r.friend_display_name,
                email: r.friend_email,
                avatar_url: r.friend_avatar_url,
            },
            friend_status: r.friend_status,
            my_status: r.my_status,
        }
    }
}

const FEED_QUERY: &str = r#"
WITH friends AS (
    SELECT DISTINCT CASE WHEN f.user_id = $1 THEN f.friend_id ELSE f.user_id END AS friend_id
    FROM friendships f
    WHERE f.status = 'accepted'
      AND (f.user_id = $1 OR f.friend_id = $1)
)
SELECT
    c.id AS concert_id,
    c.title,
    c.artist,
    c.location,
    c.date,
    c.ticket_url,
    c.source_url,
    c.created_by,
    c.created_at AS concert_created_at,
    u.id AS friend_id,
    u.created_at AS friend_created_at,
    u.display_name AS friend_display_name,
    u.email AS friend_email,
    u.avatar_url AS friend_avatar_url,
    uc.status AS friend_status,
    mine.status AS my_status
FROM friends
JOIN user_concerts uc ON uc.user_id = friends.friend_id
JOIN concerts c ON c.id = uc.concert_id
JOIN users u ON u.id = uc.user_id
LEFT JOIN user_concerts mine ON mine.concert_id = c.id AND mine.user_id = $1
WHERE c.date >= $2
  AND friends.friend_id <> $1
ORDER BY c.date ASC, c.id, uc.created_at ASC
"#;

#[async_trait]
impl Store for PgStore {
    async fn upsert_profile(&self, profile: &NewProfile) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, display_name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                email = COALESCE(EXCLUDED.email, users.email),
                display_name = COALESCE(users.display_name, EXCLUDED.display_name),
                avatar_url = COALESCE(users.avatar_url, EXCLUDED.avatar_url)
            RETURNING id, created_at, display_name, email, avatar_url
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(&profile.avatar_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, display_name, email, avatar_url FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, display_name, email, avatar_url FROM users WHERE email = $1 LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(
            "SELECT id, created_at, display_name, email, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn list_concerts(&self) -> StoreResult<Vec<Concert>> {
        let concerts = sqlx::query_as::<_, Concert>(&format!(
            "SELECT {CONCERT_COLUMNS} FROM concerts ORDER BY date ASC, created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(concerts)
    }

    async fn get_concert(&self, id: Uuid) -> StoreResult<Option<Concert>> {
        let concert = sqlx::query_as::<_, Concert>(&format!(
            "SELECT {CONCERT_COLUMNS} FROM concerts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(concert)
    }

    async fn insert_concert(&self, created_by: Uuid, draft: &ConcertDraft) -> StoreResult<Concert> {
        let concert = sqlx::query_as::<_, Concert>(&format!(
            "INSERT INTO concerts (title, artist, location, date, ticket_url, source_url, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {CONCERT_COLUMNS}"
        ))
        .bind(&draft.title)
        .bind(&draft.artist)
        .bind(&draft.location)
        .bind(draft.date)
        .bind(&draft.ticket_url)
        .bind(&draft.source_url)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(concert)
    }

    async fn update_concert(
        &self,
        id: Uuid,
        draft: &ConcertDraft,
    ) -> StoreResult<Option<Concert>> {
        let concert = sqlx::query_as::<_, Concert>(&format!(
            "UPDATE concerts SET title = $2, artist = $3, location = $4, date = $5, \
             ticket_url = $6, source_url = $7 WHERE id = $1 RETURNING {CONCERT_COLUMNS}"
        ))
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.artist)
        .bind(&draft.location)
        .bind(draft.date)
        .bind(&draft.ticket_url)
        .bind(&draft.source_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(concert)
    }

    async fn delete_concert(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM concerts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn user_concert(
        &self,
        user_id: Uuid,
        concert_id: Uuid,
    ) -> StoreResult<Option<UserConcert>> {
        let row = sqlx::query_as::<_, UserConcert>(
            "SELECT id, user_id, concert_id, status, created_at FROM user_concerts \
             WHERE user_id = $1 AND concert_id = $2",
        )
        .bind(user_id)
        .bind(concert_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn user_concerts_for(&self, user_id: Uuid) -> StoreResult<Vec<UserConcert>> {
        let rows = sqlx::query_as::<_, UserConcert>(
            "SELECT id, user_id, concert_id, status, created_at FROM user_concerts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn marks_on(
        &self,
        user_ids: &[Uuid],
        concert_ids: &[Uuid],
    ) -> StoreResult<Vec<UserConcert>> {
        if user_ids.is_empty() || concert_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserConcert>(
            "SELECT id, user_id, concert_id, status, created_at FROM user_concerts \
             WHERE user_id = ANY($1) AND concert_id = ANY($2) ORDER BY created_at ASC",
        )
        .bind(user_ids)
        .bind(concert_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_user_concert(
        &self,
        user_id: Uuid,
        concert_id: Uuid,
        status: ConcertStatus,
    ) -> StoreResult<UserConcert> {
        let row = sqlx::query_as::<_, UserConcert>(
            r#"
            INSERT INTO user_concerts (user_id, concert_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, concert_id) DO UPDATE SET status = EXCLUDED.status
            RETURNING id, user_id, concert_id, status, created_at
            "#,
        )
        .bind(user_id)
        .bind(concert_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_user_concert(&self, user_id: Uuid, concert_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_concerts WHERE user_id = $1 AND concert_id = $2")
            .bind(user_id)
            .bind(concert_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn friendships_for(&self, user_id: Uuid) -> StoreResult<Vec<Friendship>> {
        let rows = sqlx::query_as::<_, Friendship>(
            "SELECT id, user_id, friend_id, status, created_at FROM friendships \
             WHERE user_id = $1 OR friend_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn accepted_friend_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT CASE WHEN user_id = $1 THEN friend_id ELSE user_id END
            FROM friendships
            WHERE status = 'accepted' AND (user_id = $1 OR friend_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().filter(|id| *id != user_id).collect())
    }

    async fn get_friendship(&self, id: Uuid) -> StoreResult<Option<Friendship>> {
        let row = sqlx::query_as::<_, Friendship>(
            "SELECT id, user_id, friend_id, status, created_at FROM friendships WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_friendship(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<Friendship> {
        let row = sqlx::query_as::<_, Friendship>(
            "INSERT INTO friendships (user_id, friend_id) VALUES ($1, $2) \
             RETURNING id, user_id, friend_id, status, created_at",
        )
        .bind(user_id)
        .bind(friend_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_friendship_status(
        &self,
        id: Uuid,
        status: FriendshipStatus,
    ) -> StoreResult<Option<Friendship>> {
        let row = sqlx::query_as::<_, Friendship>(
            "UPDATE friendships SET status = $2 WHERE id = $1 \
             RETURNING id, user_id, friend_id, status, created_at",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_friendship(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM friendships WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn feed_rows(&self, user_id: Uuid, today: NaiveDate) -> StoreResult<Vec<FeedRow>> {
        let records = sqlx::query_as::<_, FeedRecord>(FEED_QUERY)
            .bind(user_id)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(FeedRow::from).collect())
    }

    async fn upcoming_marked(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        limit: i64,
    ) -> StoreResult<Vec<Concert>> {
        let concerts = sqlx::query_as::<_, Concert>(
            r#"
            SELECT c.id, c.title, c.artist, c.location, c.date, c.ticket_url, c.source_url,
                   c.created_by, c.created_at
            FROM concerts c
            JOIN user_concerts uc ON uc.concert_id = c.id AND uc.user_id = $1
            WHERE c.date >= $2
            ORDER BY c.date ASC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(concerts)
    }

    async fn notifications_for(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, type, payload, is_read, created_at FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: Uuid) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
