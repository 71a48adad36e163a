use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("token lookup collision")]
    TokenLookupCollision,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no token provided")]
    Unauthenticated,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidUsername(String),

    #[error("username is already taken")]
    UsernameTaken,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl Error {
    /// True when the store reports a table that has not been created yet.
    #[must_use]
    pub fn is_missing_table(&self) -> bool {
        match self {
            Error::Database(rusqlite::Error::SqliteFailure(_, Some(msg))) => {
                msg.contains("no such table")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
