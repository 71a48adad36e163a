use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::access::readable_repo;
use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::dto::StarResponse;
use crate::server::extract::Json;
use crate::server::response::{ApiError, StoreResultExt};
use crate::types::Star;

pub async fn star_repo(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let repo = readable_repo(store, &id, &auth.identity).api_err("Repository not found")?;

    store.add_star(&Star {
        user_id: auth.identity.id.clone(),
        repo_id: repo.id.clone(),
        created_at: Utc::now(),
    })?;

    Ok::<_, ApiError>(Json(StarResponse {
        starred: true,
        star_count: store.count_stars(&repo.id)?,
    }))
}

pub async fn unstar_repo(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let repo = readable_repo(store, &id, &auth.identity).api_err("Repository not found")?;

    store.remove_star(&auth.identity.id, &repo.id)?;

    Ok::<_, ApiError>(Json(StarResponse {
        starred: false,
        star_count: store.count_stars(&repo.id)?,
    }))
}
