use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use super::files::new_file;
use crate::access::{enrich_repos, owned_repo, readable_repo, visible_repos};
use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::dto::{CreateRepoRequest, ListReposQuery};
use crate::server::extract::Json;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::{normalize_tags, validate_file_name, validate_repo_name};
use crate::types::{File, Repository};

pub async fn list_repos(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListReposQuery>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let repos = visible_repos(store, &auth.identity, query.owner.as_deref())?;

    Ok::<_, ApiError>(Json(enrich_repos(store, repos)))
}

pub async fn get_repo(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let repo = readable_repo(store, &id, &auth.identity).api_err("Repository not found")?;

    let enriched = enrich_repos(store, vec![repo])
        .into_iter()
        .next()
        .or_not_found("Repository not found")?;

    Ok::<_, ApiError>(Json(enriched))
}

pub async fn create_repo(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRepoRequest>,
) -> impl IntoResponse {
    let name = validate_repo_name(&req.name)?;
    let tags = normalize_tags(req.tags);
    let description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let repo = Repository {
        id: Uuid::new_v4().to_string(),
        user_id: auth.identity.id.clone(),
        name,
        description,
        tags,
        is_public: req.is_public,
        star_count: 0,
        comment_count: 0,
        created_at: Utc::now(),
    };

    let files = req
        .files
        .into_iter()
        .map(|f| Ok(new_file(&repo.id, validate_file_name(&f.name)?, f.content)))
        .collect::<Result<Vec<File>, ApiError>>()?;

    let store = state.store.as_ref();
    store.create_repo(&repo, &files)?;

    tracing::info!(
        repo_id = %repo.id,
        user_id = %repo.user_id,
        files = files.len(),
        "Created repository"
    );

    let created = store.get_repo(&repo.id)?.or_not_found("Repository not found")?;
    let enriched = enrich_repos(store, vec![created])
        .into_iter()
        .next()
        .or_not_found("Repository not found")?;

    Ok::<_, ApiError>(Json(enriched))
}

pub async fn delete_repo(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let repo = owned_repo(store, &id, &auth.identity).api_err("Repository not found")?;

    if !store.delete_repo(&repo.id)? {
        return Err(ApiError::not_found("Repository not found"));
    }

    tracing::info!(repo_id = %repo.id, "Deleted repository");

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
