use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::{Concert, ConcertDraft, ConcertStatus};
use crate::store::Store;
use crate::utils::error::AppError;

/// How many upcoming concerts the dashboard shows.
pub const DASHBOARD_LIMIT: i64 = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcertFilter {
    #[default]
    All,
    Mine,
}

/// A concert as one user sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcertView {
    #[serde(flatten)]
    pub concert: Concert,
    pub my_status: Option<ConcertStatus>,
    pub can_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendSign {
    pub display_name: String,
    pub status: ConcertStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardConcert {
    #[serde(flatten)]
    pub view: ConcertView,
    pub friend_signs: Vec<FriendSign>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub display_name: String,
    pub upcoming: Vec<DashboardConcert>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(draft: ConcertDraft) -> Result<ConcertDraft, AppError> {
    let required = [
        ("title", &draft.title),
        ("artist", &draft.artist),
        ("location", &draft.location),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(AppError::ValidationError(format!("The {field} is required")));
    }

    Ok(ConcertDraft {
        title: draft.title.trim().to_string(),
        artist: draft.artist.trim().to_string(),
        location: draft.location.trim().to_string(),
        date: draft.date,
        ticket_url: blank_to_none(draft.ticket_url),
        source_url: blank_to_none(draft.source_url),
    })
}

/// Loads the concert and checks the caller created it.
async fn owned_concert(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<Concert, AppError> {
    let concert = store
        .get_concert(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Concert '{id}' was not found")))?;
    if concert.created_by != user_id {
        return Err(AppError::Forbidden(
            "Only the person who added a concert can change it".to_string(),
        ));
    }
    Ok(concert)
}

pub async fn list(
    store: &dyn Store,
    user_id: Uuid,
    filter: ConcertFilter,
) -> Result<Vec<ConcertView>, AppError> {
    let concerts = store.list_concerts().await?;
    let mine: HashMap<Uuid, ConcertStatus> = store
        .user_concerts_for(user_id)
        .await?
        .into_iter()
        .map(|uc| (uc.concert_id, uc.status))
        .collect();

    Ok(concerts
        .into_iter()
        .filter(|c| filter == ConcertFilter::All || mine.contains_key(&c.id))
        .map(|concert| ConcertView {
            my_status: mine.get(&concert.id).copied(),
            can_edit: concert.created_by == user_id,
            concert,
        })
        .collect())
}

pub async fn create(
    store: &dyn Store,
    user_id: Uuid,
    draft: ConcertDraft,
) -> Result<Concert, AppError> {
    let draft = validate(draft)?;
    let concert = store.insert_concert(user_id, &draft).await?;
    info!(concert_id = %concert.id, %user_id, "Concert added");
    Ok(concert)
}

pub async fn update(
    store: &dyn Store,
    user_id: Uuid,
    id: Uuid,
    draft: ConcertDraft,
) -> Result<Concert, AppError> {
    let draft = validate(draft)?;
    owned_concert(store, user_id, id).await?;
    store
        .update_concert(id, &draft)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Concert '{id}' was not found")))
}

pub async fn delete(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    owned_concert(store, user_id, id).await?;
    if !store.delete_concert(id).await? {
        return Err(AppError::NotFound(format!("Concert '{id}' was not found")));
    }
    info!(concert_id = %id, %user_id, "Concert deleted");
    Ok(())
}

/// Picking the status a user already has clears it; picking the other one
/// switches to it. Returns the status now in effect.
pub async fn toggle_status(
    store: &dyn Store,
    user_id: Uuid,
    concert_id: Uuid,
    requested: ConcertStatus,
) -> Result<Option<ConcertStatus>, AppError> {
    if store.get_concert(concert_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Concert '{concert_id}' was not found"
        )));
    }

    let current = store
        .user_concert(user_id, concert_id)
        .await?
        .map(|uc| uc.status);

    if current == Some(requested) {
        store.delete_user_concert(user_id, concert_id).await?;
        Ok(None)
    } else {
        let row = store
            .upsert_user_concert(user_id, concert_id, requested)
            .await?;
        Ok(Some(row.status))
    }
}

pub async fn dashboard(
    store: &dyn Store,
    user_id: Uuid,
    fallback_name: Option<&str>,
    today: NaiveDate,
) -> Result<Dashboard, AppError> {
    let profile = store.find_user(user_id).await?;
    let display_name = profile
        .as_ref()
        .and_then(|p| p.display_name.clone())
        .or_else(|| fallback_name.map(str::to_string))
        .unwrap_or_else(|| "there".to_string());

    let concerts = store
        .upcoming_marked(user_id, today, DASHBOARD_LIMIT)
        .await?;
    if concerts.is_empty() {
        return Ok(Dashboard {
            display_name,
            upcoming: Vec::new(),
        });
    }

    let concert_ids: Vec<Uuid> = concerts.iter().map(|c| c.id).collect();
    let mine: HashMap<Uuid, ConcertStatus> = store
        .marks_on(&[user_id], &concert_ids)
        .await?
        .into_iter()
        .map(|uc| (uc.concert_id, uc.status))
        .collect();

    let mut signs: HashMap<Uuid, Vec<FriendSign>> = HashMap::new();
    let friend_ids = store.accepted_friend_ids(user_id).await?;
    if !friend_ids.is_empty() {
        let names: HashMap<Uuid, String> = store
            .users_by_ids(&friend_ids)
            .await?
            .into_iter()
            .map(|u| {
                let name = u.label().unwrap_or("Someone").to_string();
                (u.id, name)
            })
            .collect();

        for mark in store.marks_on(&friend_ids, &concert_ids).await? {
            let Some(name) = names.get(&mark.user_id) else {
                continue;
            };
            signs.entry(mark.concert_id).or_default().push(FriendSign {
                display_name: name.clone(),
                status: mark.status,
            });
        }
    }

    let upcoming = concerts
        .into_iter()
        .map(|concert| DashboardConcert {
            friend_signs: signs.remove(&concert.id).unwrap_or_default(),
            view: ConcertView {
                my_status: mine.get(&concert.id).copied(),
                can_edit: concert.created_by == user_id,
                concert,
            },
        })
        .collect();

    Ok(Dashboard {
        display_name,
        upcoming,
    })
}
