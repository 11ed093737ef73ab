use std::collections::HashMap;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::user::normalize_email;
use crate::models::{Friendship, FriendshipStatus, User};
use crate::store::{Store, StoreError};
use crate::utils::error::AppError;

pub const UNKNOWN_EMAIL: &str =
    "No account found with that email address. They must sign up first.";
pub const SELF_INVITE: &str = "You cannot invite yourself.";
pub const ALREADY_INVITED: &str = "You have already sent a request to this person.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendEntry {
    pub friendship: Friendship,
    /// The user on the other side, whichever direction the invite went.
    pub other: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FriendsOverview {
    pub friends: Vec<FriendEntry>,
    /// Pending requests waiting on this user.
    pub incoming: Vec<FriendEntry>,
    /// Pending requests this user sent.
    pub outgoing: Vec<FriendEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invite {
    pub friendship: Friendship,
    pub message: String,
}

/// Invites the account registered under `typed_email`. The confirmation
/// message echoes the address as the user typed it.
pub async fn invite(
    store: &dyn Store,
    user_id: Uuid,
    typed_email: &str,
) -> Result<Invite, AppError> {
    let email = normalize_email(typed_email);
    if email.is_empty() {
        return Err(AppError::ValidationError("An email address is required".to_string()));
    }

    let target = store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(UNKNOWN_EMAIL.to_string()))?;

    if target.id == user_id {
        return Err(AppError::ValidationError(SELF_INVITE.to_string()));
    }

    let friendship = match store.insert_friendship(user_id, target.id).await {
        Ok(friendship) => friendship,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(AppError::Conflict(ALREADY_INVITED.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    info!(friendship_id = %friendship.id, from = %user_id, to = %target.id, "Friend request sent");
    Ok(Invite {
        message: format!(
            "Invite sent to {}!",
            target.display_name.as_deref().unwrap_or(typed_email)
        ),
        friendship,
    })
}

pub async fn list(store: &dyn Store, user_id: Uuid) -> Result<FriendsOverview, AppError> {
    let rows = store.friendships_for(user_id).await?;
    if rows.is_empty() {
        return Ok(FriendsOverview::default());
    }

    let mut other_ids: Vec<Uuid> = rows.iter().map(|f| f.other_party(user_id)).collect();
    other_ids.sort();
    other_ids.dedup();
    let users: HashMap<Uuid, User> = store
        .users_by_ids(&other_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut overview = FriendsOverview::default();
    for friendship in rows {
        let Some(other) = users.get(&friendship.other_party(user_id)).cloned() else {
            continue;
        };
        let bucket = match friendship.status {
            FriendshipStatus::Accepted => &mut overview.friends,
            FriendshipStatus::Pending if friendship.friend_id == user_id => &mut overview.incoming,
            FriendshipStatus::Pending => &mut overview.outgoing,
            FriendshipStatus::Declined => continue,
        };
        bucket.push(FriendEntry { friendship, other });
    }

    Ok(overview)
}

/// Accepts or declines a request. Only the invitee may answer.
pub async fn respond(
    store: &dyn Store,
    user_id: Uuid,
    friendship_id: Uuid,
    accept: bool,
) -> Result<Friendship, AppError> {
    let friendship = store
        .get_friendship(friendship_id)
        .await?
        .filter(|f| f.involves(user_id))
        .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

    if friendship.friend_id != user_id {
        return Err(AppError::Forbidden(
            "Only the invited person can answer this request".to_string(),
        ));
    }

    let status = if accept {
        FriendshipStatus::Accepted
    } else {
        FriendshipStatus::Declined
    };
    let updated = store
        .set_friendship_status(friendship_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

    info!(%friendship_id, %user_id, ?status, "Friend request answered");
    Ok(updated)
}

/// Removes a friend or withdraws a request. Either side may do this.
pub async fn remove(store: &dyn Store, user_id: Uuid, friendship_id: Uuid) -> Result<(), AppError> {
    let found = store
        .get_friendship(friendship_id)
        .await?
        .is_some_and(|f| f.involves(user_id));
    if !found || !store.delete_friendship(friendship_id).await? {
        return Err(AppError::NotFound("Friendship not found".to_string()));
    }
    info!(%friendship_id, %user_id, "Friendship removed");
    Ok(())
}
