use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Comment, Repository, UserIdentity};

/// Public repositories are readable by everyone; private ones only by their owner.
#[must_use]
pub fn can_read(repo: &Repository, requester: &UserIdentity) -> bool {
    repo.is_public || repo.user_id == requester.id
}

/// Only the owner may change a repository, public or not.
#[must_use]
pub fn can_mutate(repo: &Repository, requester: &UserIdentity) -> bool {
    repo.user_id == requester.id
}

/// Only the author may delete a comment. Repository ownership does not count.
#[must_use]
pub fn can_delete_comment(comment: &Comment, requester: &UserIdentity) -> bool {
    comment.user_id == requester.id
}

/// Loads a repository the requester may read.
/// `NotFound` if it does not exist, `Forbidden` if it exists but is hidden.
pub fn readable_repo(
    store: &dyn Store,
    repo_id: &str,
    requester: &UserIdentity,
) -> Result<Repository> {
    let repo = store.get_repo(repo_id)?.ok_or(Error::NotFound)?;
    if !can_read(&repo, requester) {
        return Err(Error::Forbidden);
    }
    Ok(repo)
}

/// Loads a repository the requester owns.
pub fn owned_repo(
    store: &dyn Store,
    repo_id: &str,
    requester: &UserIdentity,
) -> Result<Repository> {
    let repo = store.get_repo(repo_id)?.ok_or(Error::NotFound)?;
    if !can_mutate(&repo, requester) {
        return Err(Error::Forbidden);
    }
    Ok(repo)
}

/// Union of two overlapping repository lists with duplicates removed by id,
/// newest first.
#[must_use]
pub fn merge_visible(public: Vec<Repository>, own: Vec<Repository>) -> Vec<Repository> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Repository> = public
        .into_iter()
        .chain(own)
        .filter(|repo| seen.insert(repo.id.clone()))
        .collect();

    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}

/// Every public repository plus all of the requester's own repositories.
/// With `owner` set, only that user's repositories are returned.
pub fn visible_repos(
    store: &dyn Store,
    requester: &UserIdentity,
    owner: Option<&str>,
) -> Result<Vec<Repository>> {
    let repos = match owner {
        Some(owner) => store
            .list_user_repos(owner)?
            .into_iter()
            .filter(|repo| can_read(repo, requester))
            .collect(),
        None => merge_visible(
            store.list_public_repos()?,
            store.list_user_repos(&requester.id)?,
        ),
    };

    debug_assert!(repos.iter().all(|repo| can_read(repo, requester)));
    Ok(repos)
}
