mod comments;
mod files;
mod repository;
mod stars;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn repos_router() -> Router<Arc<AppState>> {
    Router::new()
        // Repos
        .route("/repos", get(repository::list_repos).post(repository::create_repo))
        .route("/repos/{id}", get(repository::get_repo).delete(repository::delete_repo))
        // Stars
        .route(
            "/repos/{id}/star",
            post(stars::star_repo).delete(stars::unstar_repo),
        )
        // Files
        .route("/upload", post(files::upload_file))
        .route("/repos/{id}/files", get(files::list_files))
        // Comments
        .route(
            "/repos/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/repos/{id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
}
