use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::models::Notification;
use crate::store::Store;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationItem {
    #[serde(flatten)]
    pub notification: Notification,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

pub async fn list(store: &dyn Store, user_id: Uuid) -> Result<Vec<NotificationItem>, AppError> {
    let rows = store.notifications_for(user_id).await?;
    Ok(rows
        .into_iter()
        .map(|notification| NotificationItem {
            summary: notification.summary(),
            notification,
        })
        .collect())
}

pub async fn mark_read(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    if !store.mark_notification_read(user_id, id).await? {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(())
}

pub async fn mark_all_read(store: &dyn Store, user_id: Uuid) -> Result<u64, AppError> {
    let updated = store.mark_all_read(user_id).await?;
    debug!(%user_id, updated, "Marked notifications read");
    Ok(updated)
}

pub async fn unread_count(store: &dyn Store, user_id: Uuid) -> Result<UnreadCount, AppError> {
    Ok(UnreadCount {
        count: store.unread_count(user_id).await?,
    })
}
