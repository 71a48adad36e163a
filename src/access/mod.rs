//! Authorization and enrichment rules shared by the HTTP handlers.
//!
//! Everything here works on an authenticated [`UserIdentity`] and a
//! [`Store`]; none of it knows about HTTP.
//!
//! [`UserIdentity`]: crate::types::UserIdentity
//! [`Store`]: crate::store::Store

mod enrich;
mod profile;
mod visibility;

pub use enrich::{enrich_comments, enrich_repos, fallback_label, profile_label};
pub use profile::{
    Availability, MAX_USERNAME_LEN, MIN_USERNAME_LEN, check_availability, default_names,
    ensure_profile, synthesized_profile, upsert_profile, validate_username,
};
pub use visibility::{
    can_delete_comment, can_mutate, can_read, merge_visible, owned_repo, readable_repo,
    visible_repos,
};
