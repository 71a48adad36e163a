use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::helpers::extract_bearer_token;
use crate::access::ensure_profile;
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::UserIdentity;

/// Extractor for routes that need an authenticated user.
///
/// Resolves the bearer token through the identity provider, then makes sure
/// the user has a profile row. A failed profile insert is logged and does not
/// reject the request.
pub struct RequireIdentity {
    pub identity: UserIdentity,
}

impl FromRequestParts<Arc<AppState>> for RequireIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = extract_bearer_token(auth_header)
            .map_err(|_| ApiError::forbidden("No token provided"))?;

        let identity = state
            .identity
            .validate_token(token)
            .map_err(|e| {
                tracing::error!("Token validation failed: {e}");
                ApiError::internal(e.to_string())
            })?
            .ok_or_else(|| ApiError::forbidden("Unauthorized"))?;

        if let Err(e) = ensure_profile(state.store.as_ref(), &identity) {
            tracing::warn!(user_id = %identity.id, "Failed to ensure profile: {e}");
        }

        Ok(RequireIdentity { identity })
    }
}
