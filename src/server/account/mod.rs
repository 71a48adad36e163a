mod auth;
mod profile;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn account_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/check-username/{username}", get(auth::check_username))
        .route(
            "/profile",
            get(profile::get_own_profile)
                .post(profile::update_profile)
                .delete(profile::delete_account),
        )
        .route("/profile/avatar", post(profile::update_avatar))
        .route("/profile/{user_id}", get(profile::get_public_profile))
}
