use crate::error::{Error, Result};

/// Extracts the token from an `Authorization: Bearer <token>` header value.
/// A missing header, another scheme, or an empty token all count as
/// unauthenticated.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Result<&str> {
    let header = auth_header.ok_or(Error::Unauthenticated)?;
    let (scheme, token) = header.split_once(' ').ok_or(Error::Unauthenticated)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Error::Unauthenticated);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(Error::Unauthenticated);
    }

    Ok(token)
}
