use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::server::dto::{TagsInput, UpdateProfileRequest};
use crate::server::response::ApiError;
use crate::types::ProfileChanges;

const MAX_REPO_NAME_LEN: usize = 100;
const MAX_FILE_NAME_LEN: usize = 255;
const MAX_COMMENT_LEN: usize = 5000;
const MAX_DISPLAY_NAME_LEN: usize = 100;
const MAX_BIO_LEN: usize = 500;
const MAX_LOCATION_LEN: usize = 100;
const MAX_WEBSITE_LEN: usize = 200;

const AVATAR_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

fn check_len(value: &str, field: &str, max_len: usize) -> Result<(), ApiError> {
    if value.chars().count() > max_len {
        return Err(ApiError::bad_request(format!(
            "{field} cannot exceed {max_len} characters"
        )));
    }
    Ok(())
}

/// Returns the trimmed repository name.
pub fn validate_repo_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Repository name is required"));
    }
    check_len(name, "Repository name", MAX_REPO_NAME_LEN)?;
    Ok(name.to_string())
}

pub fn validate_file_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("File name is required"));
    }
    check_len(name, "File name", MAX_FILE_NAME_LEN)?;
    if name.contains(['/', '\\', '\0']) {
        return Err(ApiError::bad_request(
            "File name cannot contain path separators",
        ));
    }
    Ok(name.to_string())
}

/// Trims tags and drops empty or repeated ones, keeping first-seen order.
#[must_use]
pub fn normalize_tags(input: TagsInput) -> Vec<String> {
    let raw: Vec<String> = match input {
        TagsInput::List(tags) => tags,
        TagsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };

    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Returns the trimmed comment body.
pub fn validate_comment(content: &str) -> Result<String, ApiError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Comment content is required"));
    }
    check_len(content, "Comment", MAX_COMMENT_LEN)?;
    Ok(content.to_string())
}

/// Checks field lengths and turns the request into store changes. Username
/// rules are applied later by the profile upsert.
pub fn validate_profile_update(req: UpdateProfileRequest) -> Result<ProfileChanges, ApiError> {
    let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string());

    let changes = ProfileChanges {
        username: trimmed(req.username),
        display_name: trimmed(req.display_name),
        bio: trimmed(req.bio),
        website: trimmed(req.website),
        location: trimmed(req.location),
    };

    if let Some(display_name) = &changes.display_name {
        check_len(display_name, "Display name", MAX_DISPLAY_NAME_LEN)?;
    }
    if let Some(bio) = &changes.bio {
        check_len(bio, "Bio", MAX_BIO_LEN)?;
    }
    if let Some(location) = &changes.location {
        check_len(location, "Location", MAX_LOCATION_LEN)?;
    }
    if let Some(website) = &changes.website {
        check_len(website, "Website", MAX_WEBSITE_LEN)?;
    }

    Ok(changes)
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.contains(char::is_whitespace))
}

/// Validates an avatar value: an http(s) URL, or a base64 image data URL
/// whose decoded size is at most `max_bytes`. An empty value clears the avatar.
pub fn validate_avatar(value: &str, max_bytes: usize) -> Result<Option<String>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if is_http_url(value) {
        return Ok(Some(value.to_string()));
    }

    let Some(data) = value.strip_prefix("data:") else {
        return Err(ApiError::bad_request(
            "Avatar must be an http(s) URL or an image data URL",
        ));
    };
    let (mime, payload) = data
        .split_once(";base64,")
        .ok_or_else(|| ApiError::bad_request("Avatar data URL must be base64 encoded"))?;

    if !AVATAR_MIME_TYPES.contains(&mime) {
        return Err(ApiError::bad_request(
            "Avatar must be a PNG, JPEG, GIF or WebP image",
        ));
    }

    // Reject on the encoded length before decoding anything large.
    if payload.len() / 4 * 3 > max_bytes + 2 {
        return Err(avatar_too_large(max_bytes));
    }
    let decoded = STANDARD
        .decode(payload)
        .map_err(|_| ApiError::bad_request("Avatar data is not valid base64"))?;
    if decoded.len() > max_bytes {
        return Err(avatar_too_large(max_bytes));
    }

    Ok(Some(value.to_string()))
}

fn avatar_too_large(max_bytes: usize) -> ApiError {
    ApiError::bad_request(format!(
        "Avatar image cannot exceed {} KB",
        max_bytes / 1024
    ))
}
