use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An author account. Accounts are created through the setup CLI, never
/// through the web surface.
#[derive(Debug, Serialize)]
pub struct Author {
    pub id: i64,
    pub username: String,
    pub is_active: bool,
    pub last_login_time: Option<String>,
}

/// A blog entry. `published_date` of `None` means draft.
#[derive(Debug, Serialize, Clone)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub title: String,
    pub text: String,
    pub create_date: DateTime<Utc>,
    pub published_date: Option<DateTime<Utc>>,
}

impl Post {
    /// A post is published iff its publication timestamp exists and is not
    /// in the future.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.published_date.map_or(false, |d| d <= now)
    }
}

/// A visitor-submitted reply to a post. `author` is a free-text display
/// name, not an account reference. Hidden until approved.
#[derive(Debug, Serialize, Clone)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub text: String,
    pub create_date: DateTime<Utc>,
    pub approved_comment: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success' or 'error'
}

pub mod db_operations;
