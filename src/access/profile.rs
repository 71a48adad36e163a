use chrono::Utc;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{ProfileChanges, UserIdentity, UserProfile};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 39;
const DEFAULT_USERNAME: &str = "user";
const SUFFIX_ID_CHARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Usernames are 3 to 39 characters from `[a-zA-Z0-9_-]`.
pub fn validate_username(candidate: &str) -> Result<()> {
    let len = candidate.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(Error::InvalidUsername(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if len > MAX_USERNAME_LEN {
        return Err(Error::InvalidUsername(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !candidate.chars().all(is_username_char) {
        return Err(Error::InvalidUsername(
            "Username can only contain letters, numbers, hyphens, and underscores".to_string(),
        ));
    }
    Ok(())
}

/// Turns an identity hint into a valid username, or `None` if too little survives.
fn sanitize_hint(hint: &str) -> Option<String> {
    let cleaned: String = hint
        .trim()
        .chars()
        .filter(|c| is_username_char(*c))
        .take(MAX_USERNAME_LEN)
        .collect();
    (cleaned.chars().count() >= MIN_USERNAME_LEN).then_some(cleaned)
}

/// Default `(username, display_name)` for a new profile, taken from the
/// provider username, then the email local part, then `"user"`.
#[must_use]
pub fn default_names(identity: &UserIdentity) -> (String, String) {
    let email_local = identity
        .email
        .as_deref()
        .and_then(|email| email.split('@').next());

    for hint in [identity.oauth_username.as_deref(), email_local]
        .into_iter()
        .flatten()
    {
        if let Some(username) = sanitize_hint(hint) {
            return (username, hint.trim().to_string());
        }
    }

    (DEFAULT_USERNAME.to_string(), DEFAULT_USERNAME.to_string())
}

/// Username used when the default is already taken by someone else.
fn suffixed_username(base: &str, user_id: &str) -> String {
    let suffix: String = user_id
        .chars()
        .filter(|c| is_username_char(*c))
        .take(SUFFIX_ID_CHARS)
        .collect();
    let room = MAX_USERNAME_LEN - suffix.len() - 1;
    let base: String = base.chars().take(room).collect();
    format!("{base}_{suffix}")
}

fn new_profile(identity: &UserIdentity) -> UserProfile {
    let (username, display_name) = default_names(identity);
    let now = Utc::now();
    UserProfile {
        user_id: identity.id.clone(),
        username,
        display_name,
        bio: None,
        website: None,
        location: None,
        avatar_url: None,
        created_at: now,
        updated_at: now,
    }
}

/// Profile returned when no row can be read, never persisted.
#[must_use]
pub fn synthesized_profile(identity: &UserIdentity) -> UserProfile {
    new_profile(identity)
}

/// Inserts the default profile, retrying once with a suffixed username if the
/// default collides with another user's. Explicitly chosen usernames are not
/// rewritten.
fn insert_default(
    store: &dyn Store,
    mut profile: UserProfile,
    explicit_username: bool,
) -> Result<()> {
    match store.insert_profile(&profile) {
        Err(Error::UsernameTaken) if !explicit_username => {
            profile.username = suffixed_username(&profile.username, &profile.user_id);
            store.insert_profile(&profile)
        }
        other => other,
    }
}

/// Creates the requester's profile if it does not exist yet.
/// Returns true if a row was inserted; an existing row is left untouched.
pub fn ensure_profile(store: &dyn Store, identity: &UserIdentity) -> Result<bool> {
    if store.get_profile(&identity.id)?.is_some() {
        return Ok(false);
    }

    match insert_default(store, new_profile(identity), false) {
        Ok(()) => {
            tracing::info!(user_id = %identity.id, "Created profile");
            Ok(true)
        }
        // Another request created it between the lookup and the insert.
        Err(Error::AlreadyExists) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Fails with `UsernameTaken` if another user holds `username` (ignoring case).
fn ensure_username_free(store: &dyn Store, username: &str, user_id: &str) -> Result<()> {
    match store.get_profile_by_username(username)? {
        Some(existing) if existing.user_id != user_id => Err(Error::UsernameTaken),
        _ => Ok(()),
    }
}

/// Updates the requester's profile with `changes`, creating it first if absent.
///
/// The update is attempted first; only a missing row leads to an insert. The
/// uniqueness check here is a fast path, the store's constraint decides.
pub fn upsert_profile(
    store: &dyn Store,
    identity: &UserIdentity,
    changes: &ProfileChanges,
) -> Result<UserProfile> {
    if let Some(username) = &changes.username {
        validate_username(username)?;
        ensure_username_free(store, username, &identity.id)?;
    }

    match store.update_profile_fields(&identity.id, changes) {
        Err(Error::NotFound) => {}
        other => return other,
    }

    let mut profile = new_profile(identity);
    changes.apply(&mut profile);

    match insert_default(store, profile.clone(), changes.username.is_some()) {
        Ok(()) => store.get_profile(&identity.id)?.ok_or(Error::NotFound),
        // Lost a race with a concurrent insert; the row exists now.
        Err(Error::AlreadyExists) => store.update_profile_fields(&identity.id, changes),
        Err(e) => Err(e),
    }
}

/// Username pre-check for the signup form. Advisory only.
pub fn check_availability(store: &dyn Store, candidate: &str) -> Result<Availability> {
    validate_username(candidate)?;

    match store.get_profile_by_username(candidate) {
        Ok(existing) => Ok(Availability {
            available: existing.is_none(),
        }),
        Err(e) if e.is_missing_table() => Ok(Availability { available: true }),
        Err(e) => Err(e),
    }
}
