use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `users` table. The id is the auth provider's user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    /// Display name, falling back to the email address.
    pub fn label(&self) -> Option<&str> {
        self.display_name.as_deref().or(self.email.as_deref())
    }
}

/// Profile data synced from the auth provider on sign-up and sign-in.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Emails are matched exactly after trimming and lowercasing.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_display_name() {
        let mut user = User {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            display_name: Some("Jane Smith".to_string()),
            email: Some("jane@example.com".to_string()),
            avatar_url: None,
        };
        assert_eq!(user.label(), Some("Jane Smith"));

        user.display_name = None;
        assert_eq!(user.label(), Some("jane@example.com"));

        user.email = None;
        assert_eq!(user.label(), None);
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }
}
