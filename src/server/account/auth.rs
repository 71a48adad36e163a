use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use crate::access::{check_availability, upsert_profile, validate_username};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{LoginRequest, SignupRequest};
use crate::server::extract::Json;
use crate::server::response::ApiError;
use crate::types::ProfileChanges;

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> impl IntoResponse {
    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    // Advisory check so that an obviously taken name never creates an identity.
    if let Some(username) = username {
        validate_username(username)?;
        if !check_availability(state.store.as_ref(), username)?.available {
            return Err(ApiError::from(Error::UsernameTaken));
        }
    }

    let auth = state
        .identity
        .sign_up(&req.email, &req.password, username)?;

    let display_name = req
        .display_name
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    if username.is_some() || display_name.is_some() {
        let changes = ProfileChanges {
            username: username.map(str::to_string),
            display_name,
            ..ProfileChanges::default()
        };

        if let Err(e) = upsert_profile(state.store.as_ref(), &auth.user, &changes) {
            // The name was claimed between the check and the insert.
            if let Err(cleanup) = state.identity.delete_identity(&auth.user.id) {
                tracing::error!(user_id = %auth.user.id, "Failed to roll back signup: {cleanup}");
            }
            return Err(ApiError::from(e));
        }
    }

    Ok::<_, ApiError>(Json(auth))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let auth = state.identity.sign_in(&req.email, &req.password)?;
    Ok::<_, ApiError>(Json(auth))
}

pub async fn check_username(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let availability = check_availability(state.store.as_ref(), &username)?;
    Ok::<_, ApiError>(Json(availability))
}
