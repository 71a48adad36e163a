use serde::{Deserialize, Serialize};

use crate::types::{File, UserIdentity, UserProfile};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tags may arrive as a JSON array or as a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl Default for TagsInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
pub struct NewFileRequest {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRepoRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: TagsInput,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub files: Vec<NewFileRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListReposQuery {
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub repo_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file: File,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct StarResponse {
    pub starred: bool,
    pub star_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    pub avatar_url: String,
}

/// The requester's own profile, which unlike `PublicProfile` includes the email.
#[derive(Debug, Serialize)]
pub struct OwnProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub email: Option<String>,
}

impl OwnProfileResponse {
    #[must_use]
    pub fn new(profile: UserProfile, identity: &UserIdentity) -> Self {
        Self {
            profile,
            email: identity.email.clone(),
        }
    }
}
