use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::access::{synthesized_profile, upsert_profile};
use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::dto::{AvatarRequest, OwnProfileResponse, UpdateProfileRequest};
use crate::server::extract::Json;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_avatar, validate_profile_update};
use crate::types::PublicProfile;

pub async fn get_own_profile(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let identity = auth.identity;

    // The extractor already tried to create the row; fall back if it still
    // cannot be read.
    let profile = match state.store.get_profile(&identity.id) {
        Ok(Some(profile)) => profile,
        Ok(None) => synthesized_profile(&identity),
        Err(e) if e.is_missing_table() => synthesized_profile(&identity),
        Err(e) => return Err(ApiError::from(e)),
    };

    Ok::<_, ApiError>(Json(OwnProfileResponse::new(profile, &identity)))
}

pub async fn get_public_profile(
    _auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let profile = state
        .store
        .get_profile(&user_id)?
        .or_not_found("Profile not found")?;

    let repo_count = state.store.count_public_repos(&user_id)?;

    Ok::<_, ApiError>(Json(PublicProfile::new(profile, repo_count)))
}

pub async fn update_profile(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let changes = validate_profile_update(req)?;
    let profile = upsert_profile(state.store.as_ref(), &auth.identity, &changes)?;

    tracing::info!(user_id = %auth.identity.id, "Updated profile");

    Ok::<_, ApiError>(Json(OwnProfileResponse::new(profile, &auth.identity)))
}

pub async fn update_avatar(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AvatarRequest>,
) -> impl IntoResponse {
    let avatar = validate_avatar(&req.avatar_url, state.config.max_avatar_bytes)?;

    state
        .store
        .set_profile_avatar(&auth.identity.id, avatar.as_deref())
        .api_err("Profile not found")?;

    let profile = state
        .store
        .get_profile(&auth.identity.id)?
        .or_not_found("Profile not found")?;

    Ok::<_, ApiError>(Json(OwnProfileResponse::new(profile, &auth.identity)))
}

pub async fn delete_account(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = &auth.identity.id;

    state.store.delete_account_data(user_id)?;

    tracing::info!(user_id = %user_id, "Deleted account");

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
