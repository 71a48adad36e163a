use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{TokenGenerator, parse_token};
use crate::config::MAX_SESSION_TTL_HOURS;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{IdentityRecord, Session, UserIdentity};

const MIN_PASSWORD_LEN: usize = 6;
const MAX_SESSION_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Response of a successful sign-up or sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: UserIdentity,
    pub session: IssuedSession,
}

/// Issues and validates bearer tokens. The rest of the crate only depends on
/// this trait, so a hosted provider can replace the bundled one.
pub trait IdentityProvider: Send + Sync {
    /// Registers an identity. `username` is kept as provider metadata.
    fn sign_up(&self, email: &str, password: &str, username: Option<&str>) -> Result<AuthSession>;
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;
    /// Resolves a raw bearer token. Unknown, expired and malformed tokens
    /// resolve to `None`; `Err` is reserved for provider failures.
    fn validate_token(&self, token: &str) -> Result<Option<UserIdentity>>;
    fn delete_identity(&self, id: &str) -> Result<bool>;
}

/// Identity provider backed by the application's own database.
pub struct LocalIdentityProvider {
    store: Arc<dyn Store>,
    generator: TokenGenerator,
    session_ttl: Duration,
}

impl LocalIdentityProvider {
    /// `session_ttl_hours` is clamped to `1..=MAX_SESSION_TTL_HOURS`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, session_ttl_hours: i64) -> Self {
        Self {
            store,
            generator: TokenGenerator::new(),
            session_ttl: Duration::hours(session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS)),
        }
    }

    fn issue_session(&self, identity: UserIdentity) -> Result<AuthSession> {
        for _ in 0..MAX_SESSION_RETRIES {
            let (raw_token, lookup, hash) = self.generator.generate()?;
            let now = Utc::now();
            let session = Session {
                id: Uuid::new_v4().to_string(),
                token_hash: hash,
                token_lookup: lookup,
                identity_id: identity.id.clone(),
                created_at: now,
                expires_at: now + self.session_ttl,
                last_used_at: None,
            };

            match self.store.create_session(&session) {
                Ok(()) => {
                    return Ok(AuthSession {
                        user: identity,
                        session: IssuedSession {
                            access_token: raw_token,
                            token_type: "bearer",
                            expires_at: session.expires_at,
                        },
                    });
                }
                Err(Error::TokenLookupCollision) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::TokenLookupCollision)
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(Error::BadRequest("Invalid email address".to_string())),
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn sign_up(&self, email: &str, password: &str, username: Option<&str>) -> Result<AuthSession> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::BadRequest(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let identity = UserIdentity {
            id: Uuid::new_v4().to_string(),
            email: Some(email),
            oauth_username: username.map(str::to_string),
            created_at: Utc::now(),
        };
        let record = IdentityRecord {
            identity: identity.clone(),
            password_hash: self.generator.hash(password)?,
        };

        self.store.create_identity(&record)?;
        tracing::info!(user_id = %identity.id, "Registered identity");

        self.issue_session(identity)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email).map_err(|_| Error::InvalidCredentials)?;
        let record = self
            .store
            .get_identity_by_email(&email)?
            .ok_or(Error::InvalidCredentials)?;

        if !self.generator.verify(password, &record.password_hash)? {
            return Err(Error::InvalidCredentials);
        }

        match self.store.delete_expired_sessions() {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Removed {n} expired sessions"),
            Err(e) => tracing::warn!("Failed to remove expired sessions: {e}"),
        }

        self.issue_session(record.identity)
    }

    fn validate_token(&self, token: &str) -> Result<Option<UserIdentity>> {
        let Ok((lookup, _secret)) = parse_token(token) else {
            return Ok(None);
        };

        let Some(session) = self.store.get_session_by_lookup(&lookup)? else {
            return Ok(None);
        };

        if !self.generator.verify(token, &session.token_hash)? {
            return Ok(None);
        }

        if session.expires_at < Utc::now() {
            return Ok(None);
        }

        let identity = self.store.get_identity(&session.identity_id)?;

        if let Err(e) = self.store.update_session_last_used(&session.id) {
            tracing::warn!("Failed to update session last_used_at: {e}");
        }

        Ok(identity)
    }

    fn delete_identity(&self, id: &str) -> Result<bool> {
        self.store.delete_identity(id)
    }
}
