mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Identity operations (used by the bundled identity provider)
    fn create_identity(&self, record: &IdentityRecord) -> Result<()>;
    fn get_identity(&self, id: &str) -> Result<Option<UserIdentity>>;
    fn get_identity_by_email(&self, email: &str) -> Result<Option<IdentityRecord>>;
    fn delete_identity(&self, id: &str) -> Result<bool>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn delete_expired_sessions(&self) -> Result<usize>;
    fn update_session_last_used(&self, id: &str) -> Result<()>;

    // Profile operations
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    /// Case-insensitive lookup.
    fn get_profile_by_username(&self, username: &str) -> Result<Option<UserProfile>>;
    fn list_profiles(&self, user_ids: &[String]) -> Result<Vec<UserProfile>>;
    /// Inserts a profile row. A duplicate `user_id` yields `AlreadyExists`,
    /// a duplicate username yields `UsernameTaken`.
    fn insert_profile(&self, profile: &UserProfile) -> Result<()>;
    /// Applies the set fields to the row keyed by `user_id` and returns the
    /// result, or `NotFound` if there is no such row.
    fn update_profile_fields(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<UserProfile>;
    fn set_profile_avatar(&self, user_id: &str, avatar_url: Option<&str>) -> Result<()>;
    /// Removes the user's repositories (with their files, comments and stars),
    /// comments, stars, profile, sessions and identity in one transaction.
    fn delete_account_data(&self, user_id: &str) -> Result<()>;

    // Repository operations
    /// Inserts the repository and its initial files in one transaction.
    fn create_repo(&self, repo: &Repository, files: &[File]) -> Result<()>;
    fn get_repo(&self, id: &str) -> Result<Option<Repository>>;
    fn list_public_repos(&self) -> Result<Vec<Repository>>;
    fn list_user_repos(&self, user_id: &str) -> Result<Vec<Repository>>;
    fn count_public_repos(&self, user_id: &str) -> Result<i64>;
    fn delete_repo(&self, id: &str) -> Result<bool>;

    // File operations
    /// Inserts the file, or replaces the content of the file with the same
    /// `(repo_id, name)`. Returns the stored row.
    fn upsert_file(&self, file: &File) -> Result<File>;
    fn list_files(&self, repo_id: &str) -> Result<Vec<File>>;

    // Comment operations
    fn create_comment(&self, comment: &Comment) -> Result<()>;
    fn get_comment(&self, id: &str) -> Result<Option<Comment>>;
    fn list_comments(&self, repo_id: &str) -> Result<Vec<Comment>>;
    fn delete_comment(&self, id: &str) -> Result<bool>;

    // Star operations
    /// Returns false if the star already existed.
    fn add_star(&self, star: &Star) -> Result<bool>;
    fn remove_star(&self, user_id: &str, repo_id: &str) -> Result<bool>;
    fn count_stars(&self, repo_id: &str) -> Result<i64>;
}
