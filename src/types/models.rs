use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Username taken from provider metadata (OAuth login or signup form).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub identity: UserIdentity,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub identity_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile edit. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
}

impl ProfileChanges {
    /// Applies the changes on top of an existing row.
    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(username) = &self.username {
            profile.username = username.clone();
        }
        if let Some(display_name) = &self.display_name {
            profile.display_name = display_name.clone();
        }
        if let Some(bio) = &self.bio {
            profile.bio = Some(bio.clone());
        }
        if let Some(website) = &self.website {
            profile.website = Some(website.clone());
        }
        if let Some(location) = &self.location {
            profile.location = Some(location.clone());
        }
    }
}

/// Profile fields that are safe to show to other users.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub repo_count: i64,
}

impl PublicProfile {
    #[must_use]
    pub fn new(profile: UserProfile, repo_count: i64) -> Self {
        Self {
            user_id: profile.user_id,
            username: profile.username,
            display_name: profile.display_name,
            bio: profile.bio,
            website: profile.website,
            location: profile.location,
            avatar_url: profile.avatar_url,
            created_at: profile.created_at,
            repo_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub is_public: bool,
    /// Number of `stars` rows for this repository.
    pub star_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub repo_id: String,
    pub name: String,
    pub content: String,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub repo_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Star {
    pub user_id: String,
    pub repo_id: String,
    pub created_at: DateTime<Utc>,
}

/// Display identity attached to rows owned or authored by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerLabel {
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRepository {
    #[serde(flatten)]
    pub repo: Repository,
    #[serde(flatten)]
    pub owner: OwnerLabel,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichedComment {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(flatten)]
    pub author: OwnerLabel,
}
