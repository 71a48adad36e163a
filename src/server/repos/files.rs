use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::access::{owned_repo, readable_repo};
use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::dto::{UploadRequest, UploadResponse};
use crate::server::extract::Json;
use crate::server::response::{ApiError, StoreResultExt};
use crate::server::validation::validate_file_name;
use crate::types::File;

/// Builds a file row with its content digest.
pub(super) fn new_file(repo_id: &str, name: String, content: String) -> File {
    let sha256 = hex::encode(Sha256::digest(content.as_bytes()));
    File {
        id: Uuid::new_v4().to_string(),
        repo_id: repo_id.to_string(),
        name,
        content,
        sha256,
        created_at: Utc::now(),
    }
}

pub async fn upload_file(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> impl IntoResponse {
    let repo_id = req
        .repo_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing repo_id"))?;
    let name = validate_file_name(req.name.as_deref().unwrap_or_default())?;

    let store = state.store.as_ref();
    let repo = owned_repo(store, &repo_id, &auth.identity).api_err("Repository not found")?;

    let file = store.upsert_file(&new_file(&repo.id, name, req.content))?;

    tracing::info!(repo_id = %repo.id, file = %file.name, "Stored file");

    Ok::<_, ApiError>(Json(UploadResponse {
        success: true,
        file,
    }))
}

pub async fn list_files(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let repo = readable_repo(store, &id, &auth.identity).api_err("Repository not found")?;

    let files = store.list_files(&repo.id)?;

    Ok::<_, ApiError>(Json(files))
}
