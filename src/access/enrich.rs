use std::collections::{BTreeSet, HashMap};

use crate::store::Store;
use crate::types::{
    Comment, EnrichedComment, EnrichedRepository, OwnerLabel, Repository, UserProfile,
};

const FALLBACK_ID_CHARS: usize = 8;

fn id_prefix(user_id: &str) -> &str {
    match user_id.char_indices().nth(FALLBACK_ID_CHARS) {
        Some((idx, _)) => &user_id[..idx],
        None => user_id,
    }
}

/// Deterministic label for a user without a readable profile row.
#[must_use]
pub fn fallback_label(user_id: &str) -> OwnerLabel {
    let prefix = id_prefix(user_id);
    OwnerLabel {
        username: format!("user_{prefix}"),
        display_name: format!("User {prefix}"),
        avatar_url: None,
    }
}

#[must_use]
pub fn profile_label(profile: &UserProfile) -> OwnerLabel {
    OwnerLabel {
        username: profile.username.clone(),
        display_name: profile.display_name.clone(),
        avatar_url: profile.avatar_url.clone(),
    }
}

/// Looks up labels for a set of users in one query. A store failure yields an
/// empty map so that every row falls back.
fn load_labels<'a>(
    store: &dyn Store,
    user_ids: impl IntoIterator<Item = &'a str>,
) -> HashMap<String, OwnerLabel> {
    let ids: Vec<String> = user_ids
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    match store.list_profiles(&ids) {
        Ok(profiles) => profiles
            .iter()
            .map(|p| (p.user_id.clone(), profile_label(p)))
            .collect(),
        Err(e) if e.is_missing_table() => {
            tracing::warn!("Profile table missing, using fallback labels");
            HashMap::new()
        }
        Err(e) => {
            tracing::warn!("Failed to load profiles for enrichment: {e}");
            HashMap::new()
        }
    }
}

fn label_or_fallback(labels: &HashMap<String, OwnerLabel>, user_id: &str) -> OwnerLabel {
    labels
        .get(user_id)
        .cloned()
        .unwrap_or_else(|| fallback_label(user_id))
}

/// Attaches the owner's display identity to each repository. Never fails.
#[must_use]
pub fn enrich_repos(store: &dyn Store, repos: Vec<Repository>) -> Vec<EnrichedRepository> {
    let labels = load_labels(store, repos.iter().map(|r| r.user_id.as_str()));

    repos
        .into_iter()
        .map(|repo| {
            let owner = label_or_fallback(&labels, &repo.user_id);
            EnrichedRepository { repo, owner }
        })
        .collect()
}

/// Attaches the author's display identity to each comment. Never fails.
#[must_use]
pub fn enrich_comments(store: &dyn Store, comments: Vec<Comment>) -> Vec<EnrichedComment> {
    let labels = load_labels(store, comments.iter().map(|c| c.user_id.as_str()));

    comments
        .into_iter()
        .map(|comment| {
            let author = label_or_fallback(&labels, &comment.user_id);
            EnrichedComment { comment, author }
        })
        .collect()
}
