use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{can_delete_comment, enrich_comments, readable_repo};
use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::dto::CreateCommentRequest;
use crate::server::extract::Json;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_comment;
use crate::types::Comment;

pub async fn list_comments(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let repo = readable_repo(store, &id, &auth.identity).api_err("Repository not found")?;

    let comments = store.list_comments(&repo.id)?;

    Ok::<_, ApiError>(Json(enrich_comments(store, comments)))
}

pub async fn create_comment(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> impl IntoResponse {
    let content = validate_comment(&req.content)?;

    let store = state.store.as_ref();
    let repo = readable_repo(store, &id, &auth.identity).api_err("Repository not found")?;

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        repo_id: repo.id,
        user_id: auth.identity.id.clone(),
        content,
        created_at: Utc::now(),
    };
    store.create_comment(&comment)?;

    let enriched = enrich_comments(store, vec![comment])
        .into_iter()
        .next()
        .or_not_found("Comment not found")?;

    Ok::<_, ApiError>(Json(enriched))
}

#[derive(Deserialize)]
pub struct CommentPath {
    id: String,
    comment_id: String,
}

pub async fn delete_comment(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(path): Path<CommentPath>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let comment = store
        .get_comment(&path.comment_id)?
        .filter(|c| c.repo_id == path.id)
        .or_not_found("Comment not found")?;

    if !can_delete_comment(&comment, &auth.identity) {
        return Err(ApiError::forbidden("You can only delete your own comments"));
    }

    store.delete_comment(&comment.id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
