use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const REPO_SELECT: &str = "SELECT r.id, r.user_id, r.name, r.description, r.tags, r.is_public, r.created_at,
        (SELECT COUNT(*) FROM stars s WHERE s.repo_id = r.id),
        (SELECT COUNT(*) FROM comments c WHERE c.repo_id = r.id)
     FROM repos r";

const PROFILE_SELECT: &str = "SELECT user_id, username, display_name, bio, website, location, avatar_url, created_at, updated_at
     FROM user_profiles";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width RFC 3339 so that `ORDER BY created_at` sorts chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_tags(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_else(|e| {
        tracing::error!("Invalid tags in database: '{}' - {}", s, e);
        Vec::new()
    })
}

fn constraint_message(e: &rusqlite::Error) -> Option<&str> {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(msg.as_deref().unwrap_or(""))
        }
        _ => None,
    }
}

fn profile_write_error(e: rusqlite::Error) -> Error {
    match constraint_message(&e) {
        Some(msg) if msg.contains("user_profiles.username") => Error::UsernameTaken,
        Some(msg) if msg.contains("user_profiles.user_id") => Error::AlreadyExists,
        _ => Error::from(e),
    }
}

fn identity_from_row(row: &Row<'_>) -> rusqlite::Result<UserIdentity> {
    Ok(UserIdentity {
        id: row.get(0)?,
        email: row.get(1)?,
        oauth_username: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        identity_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: parse_datetime(&row.get::<_, String>(5)?),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        user_id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        bio: row.get(3)?,
        website: row.get(4)?,
        location: row.get(5)?,
        avatar_url: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn repo_from_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    Ok(Repository {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        tags: parse_tags(&row.get::<_, String>(4)?),
        is_public: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        star_count: row.get(7)?,
        comment_count: row.get(8)?,
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        name: row.get(2)?,
        content: row.get(3)?,
        sha256: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn insert_file(conn: &Connection, file: &File) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO files (id, repo_id, name, content, sha256, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(repo_id, name) DO UPDATE SET content = excluded.content, sha256 = excluded.sha256",
        params![
            file.id,
            file.repo_id,
            file.name,
            file.content,
            file.sha256,
            format_datetime(&file.created_at),
        ],
    )
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Identity operations

    fn create_identity(&self, record: &IdentityRecord) -> Result<()> {
        let identity = &record.identity;
        let result = self.conn().execute(
            "INSERT INTO identities (id, email, password_hash, oauth_username, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                identity.id,
                identity.email,
                record.password_hash,
                identity.oauth_username,
                format_datetime(&identity.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_message(&e).is_some_and(|m| m.contains("identities.email")) => {
                Err(Error::Conflict("User already registered".to_string()))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_identity(&self, id: &str) -> Result<Option<UserIdentity>> {
        self.conn()
            .query_row(
                "SELECT id, email, oauth_username, created_at FROM identities WHERE id = ?1",
                params![id],
                identity_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_identity_by_email(&self, email: &str) -> Result<Option<IdentityRecord>> {
        self.conn()
            .query_row(
                "SELECT id, email, oauth_username, created_at, password_hash
                 FROM identities WHERE email = ?1",
                params![email],
                |row| {
                    Ok(IdentityRecord {
                        identity: identity_from_row(row)?,
                        password_hash: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Error::from)
    }

    fn delete_identity(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM identities WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO sessions (id, token_hash, token_lookup, identity_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id,
                session.token_hash,
                session.token_lookup,
                session.identity_id,
                format_datetime(&session.created_at),
                format_datetime(&session.expires_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_message(&e).is_some_and(|m| m.contains("sessions.token_lookup")) => {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        self.conn()
            .query_row(
                "SELECT id, token_hash, token_lookup, identity_id, created_at, expires_at, last_used_at
                 FROM sessions WHERE token_lookup = ?1",
                params![lookup],
                session_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn delete_expired_sessions(&self) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![format_datetime(&Utc::now())],
        )?;
        Ok(rows)
    }

    fn update_session_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Profile operations

    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.conn()
            .query_row(
                &format!("{PROFILE_SELECT} WHERE user_id = ?1"),
                params![user_id],
                profile_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_profile_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        self.conn()
            .query_row(
                &format!("{PROFILE_SELECT} WHERE username = ?1 COLLATE NOCASE"),
                params![username],
                profile_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_profiles(&self, user_ids: &[String]) -> Result<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; user_ids.len()].join(", ");
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{PROFILE_SELECT} WHERE user_id IN ({placeholders})"
        ))?;

        let rows = stmt.query_map(params_from_iter(user_ids.iter()), profile_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn insert_profile(&self, profile: &UserProfile) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO user_profiles
                    (user_id, username, display_name, bio, website, location, avatar_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    profile.user_id,
                    profile.username,
                    profile.display_name,
                    profile.bio,
                    profile.website,
                    profile.location,
                    profile.avatar_url,
                    format_datetime(&profile.created_at),
                    format_datetime(&profile.updated_at),
                ],
            )
            .map_err(profile_write_error)?;
        Ok(())
    }

    fn update_profile_fields(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<UserProfile> {
        let conn = self.conn();
        let rows = conn
            .execute(
                "UPDATE user_profiles
                 SET username = COALESCE(?1, username),
                     display_name = COALESCE(?2, display_name),
                     bio = COALESCE(?3, bio),
                     website = COALESCE(?4, website),
                     location = COALESCE(?5, location),
                     updated_at = ?6
                 WHERE user_id = ?7",
                params![
                    changes.username,
                    changes.display_name,
                    changes.bio,
                    changes.website,
                    changes.location,
                    format_datetime(&Utc::now()),
                    user_id,
                ],
            )
            .map_err(profile_write_error)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        conn.query_row(
            &format!("{PROFILE_SELECT} WHERE user_id = ?1"),
            params![user_id],
            profile_from_row,
        )
        .map_err(Error::from)
    }

    fn set_profile_avatar(&self, user_id: &str, avatar_url: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE user_profiles SET avatar_url = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![avatar_url, format_datetime(&Utc::now()), user_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_account_data(&self, user_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM repos WHERE user_id = ?1", params![user_id])?;
        tx.execute("DELETE FROM comments WHERE user_id = ?1", params![user_id])?;
        tx.execute("DELETE FROM stars WHERE user_id = ?1", params![user_id])?;
        tx.execute(
            "DELETE FROM user_profiles WHERE user_id = ?1",
            params![user_id],
        )?;
        // Sessions go with the identity through ON DELETE CASCADE.
        tx.execute("DELETE FROM identities WHERE id = ?1", params![user_id])?;

        tx.commit()?;
        Ok(())
    }

    // Repository operations

    fn create_repo(&self, repo: &Repository, files: &[File]) -> Result<()> {
        let tags = serde_json::to_string(&repo.tags)
            .map_err(|e| Error::BadRequest(format!("invalid tags: {e}")))?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO repos (id, user_id, name, description, tags, is_public, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                repo.id,
                repo.user_id,
                repo.name,
                repo.description,
                tags,
                repo.is_public,
                format_datetime(&repo.created_at),
            ],
        )?;

        for file in files {
            insert_file(&tx, file)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_repo(&self, id: &str) -> Result<Option<Repository>> {
        self.conn()
            .query_row(
                &format!("{REPO_SELECT} WHERE r.id = ?1"),
                params![id],
                repo_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_public_repos(&self) -> Result<Vec<Repository>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{REPO_SELECT} WHERE r.is_public = 1 ORDER BY r.created_at DESC, r.rowid DESC"
        ))?;

        let rows = stmt.query_map([], repo_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_repos(&self, user_id: &str) -> Result<Vec<Repository>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{REPO_SELECT} WHERE r.user_id = ?1 ORDER BY r.created_at DESC, r.rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], repo_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_public_repos(&self, user_id: &str) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM repos WHERE user_id = ?1 AND is_public = 1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_repo(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM repos WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // File operations

    fn upsert_file(&self, file: &File) -> Result<File> {
        let conn = self.conn();
        insert_file(&conn, file)?;

        conn.query_row(
            "SELECT id, repo_id, name, content, sha256, created_at
             FROM files WHERE repo_id = ?1 AND name = ?2",
            params![file.repo_id, file.name],
            file_from_row,
        )
        .map_err(Error::from)
    }

    fn list_files(&self, repo_id: &str) -> Result<Vec<File>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, repo_id, name, content, sha256, created_at
             FROM files WHERE repo_id = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![repo_id], file_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Comment operations

    fn create_comment(&self, comment: &Comment) -> Result<()> {
        self.conn().execute(
            "INSERT INTO comments (id, repo_id, user_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id,
                comment.repo_id,
                comment.user_id,
                comment.content,
                format_datetime(&comment.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_comment(&self, id: &str) -> Result<Option<Comment>> {
        self.conn()
            .query_row(
                "SELECT id, repo_id, user_id, content, created_at FROM comments WHERE id = ?1",
                params![id],
                comment_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_comments(&self, repo_id: &str) -> Result<Vec<Comment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, repo_id, user_id, content, created_at
             FROM comments WHERE repo_id = ?1 ORDER BY created_at, rowid",
        )?;

        let rows = stmt.query_map(params![repo_id], comment_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_comment(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Star operations

    fn add_star(&self, star: &Star) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT INTO stars (user_id, repo_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, repo_id) DO NOTHING",
            params![star.user_id, star.repo_id, format_datetime(&star.created_at)],
        )?;
        Ok(rows > 0)
    }

    fn remove_star(&self, user_id: &str, repo_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM stars WHERE user_id = ?1 AND repo_id = ?2",
            params![user_id, repo_id],
        )?;
        Ok(rows > 0)
    }

    fn count_stars(&self, repo_id: &str) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM stars WHERE repo_id = ?1",
            params![repo_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn identity(store: &SqliteStore, id: &str) {
        store
            .create_identity(&IdentityRecord {
                identity: UserIdentity {
                    id: id.to_string(),
                    email: Some(format!("{id}@example.com")),
                    oauth_username: None,
                    created_at: Utc::now(),
                },
                password_hash: "hash".to_string(),
            })
            .unwrap();
    }

    fn profile(user_id: &str, username: &str) -> UserProfile {
        UserProfile {
            user_id: user_id.to_string(),
            username: username.to_string(),
            display_name: username.to_string(),
            bio: None,
            website: None,
            location: None,
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn repo(id: &str, user_id: &str, is_public: bool) -> Repository {
        Repository {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("repo-{id}"),
            description: None,
            tags: vec!["rust".to_string(), "web".to_string()],
            is_public,
            star_count: 0,
            comment_count: 0,
            created_at: Utc::now(),
        }
    }

    fn file(repo_id: &str, name: &str, content: &str) -> File {
        File {
            id: uuid::Uuid::new_v4().to_string(),
            repo_id: repo_id.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            sha256: "digest".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = setup();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "identities",
            "sessions",
            "user_profiles",
            "repos",
            "files",
            "comments",
            "stars",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let (_temp, store) = setup();
        identity(&store, "u1");

        let result = store.create_identity(&IdentityRecord {
            identity: UserIdentity {
                id: "u2".to_string(),
                email: Some("U1@Example.com".to_string()),
                oauth_username: None,
                created_at: Utc::now(),
            },
            password_hash: "hash".to_string(),
        });
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_username_unique_ignoring_case() {
        let (_temp, store) = setup();
        identity(&store, "u1");
        identity(&store, "u2");

        store.insert_profile(&profile("u1", "bob")).unwrap();
        let result = store.insert_profile(&profile("u2", "BOB"));
        assert!(matches!(result, Err(Error::UsernameTaken)));

        let found = store.get_profile_by_username("Bob").unwrap().unwrap();
        assert_eq!(found.user_id, "u1");
    }

    #[test]
    fn test_duplicate_profile_row_rejected() {
        let (_temp, store) = setup();
        identity(&store, "u1");

        store.insert_profile(&profile("u1", "bob")).unwrap();
        let result = store.insert_profile(&profile("u1", "robert"));
        assert!(matches!(result, Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_update_missing_profile_is_not_found() {
        let (_temp, store) = setup();
        identity(&store, "u1");

        let result = store.update_profile_fields("u1", &ProfileChanges::default());
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_update_profile_fields_keeps_unset_columns() {
        let (_temp, store) = setup();
        identity(&store, "u1");
        identity(&store, "u2");
        let mut original = profile("u1", "alice");
        original.bio = Some("hello".to_string());
        store.insert_profile(&original).unwrap();
        store.insert_profile(&profile("u2", "bob")).unwrap();

        let changes = ProfileChanges {
            location: Some("Berlin".to_string()),
            ..ProfileChanges::default()
        };
        let updated = store.update_profile_fields("u1", &changes).unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert_eq!(updated.location.as_deref(), Some("Berlin"));

        let rename = ProfileChanges {
            username: Some("BOB".to_string()),
            ..ProfileChanges::default()
        };
        assert!(matches!(
            store.update_profile_fields("u1", &rename),
            Err(Error::UsernameTaken)
        ));
    }

    #[test]
    fn test_list_profiles_batch() {
        let (_temp, store) = setup();
        identity(&store, "u1");
        identity(&store, "u2");
        store.insert_profile(&profile("u1", "alice")).unwrap();

        let found = store
            .list_profiles(&["u1".to_string(), "u2".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "alice");
        assert!(store.list_profiles(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_repo_roundtrip_keeps_tag_order() {
        let (_temp, store) = setup();
        identity(&store, "u1");

        store.create_repo(&repo("r1", "u1", true), &[]).unwrap();
        let fetched = store.get_repo("r1").unwrap().unwrap();
        assert_eq!(fetched.tags, vec!["rust", "web"]);
        assert!(fetched.is_public);
    }

    #[test]
    fn test_delete_repo_cascades_files() {
        let (_temp, store) = setup();
        identity(&store, "u1");

        store
            .create_repo(&repo("r1", "u1", false), &[file("r1", "main.rs", "fn main() {}")])
            .unwrap();
        assert_eq!(store.list_files("r1").unwrap().len(), 1);

        assert!(store.delete_repo("r1").unwrap());
        assert!(store.list_files("r1").unwrap().is_empty());
        assert!(store.get_repo("r1").unwrap().is_none());
    }

    #[test]
    fn test_create_repo_rolls_back_on_file_failure() {
        let (_temp, store) = setup();
        identity(&store, "u1");

        // The file points at a different repo id, so the FK check fails.
        let result = store.create_repo(&repo("r1", "u1", false), &[file("missing", "a", "b")]);
        assert!(result.is_err());
        assert!(store.get_repo("r1").unwrap().is_none());
    }

    #[test]
    fn test_upsert_file_replaces_content() {
        let (_temp, store) = setup();
        identity(&store, "u1");
        store.create_repo(&repo("r1", "u1", false), &[]).unwrap();

        let first = store.upsert_file(&file("r1", "main.js", "v1")).unwrap();
        let second = store.upsert_file(&file("r1", "main.js", "v2")).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "v2");
        assert_eq!(store.list_files("r1").unwrap().len(), 1);
    }

    #[test]
    fn test_stars_are_unique_per_user() {
        let (_temp, store) = setup();
        identity(&store, "u1");
        store.create_repo(&repo("r1", "u1", true), &[]).unwrap();

        let star = Star {
            user_id: "u1".to_string(),
            repo_id: "r1".to_string(),
            created_at: Utc::now(),
        };
        assert!(store.add_star(&star).unwrap());
        assert!(!store.add_star(&star).unwrap());
        assert_eq!(store.count_stars("r1").unwrap(), 1);
        assert_eq!(store.get_repo("r1").unwrap().unwrap().star_count, 1);

        assert!(store.remove_star("u1", "r1").unwrap());
        assert_eq!(store.count_stars("r1").unwrap(), 0);
    }

    #[test]
    fn test_delete_account_data() {
        let (_temp, store) = setup();
        identity(&store, "u1");
        identity(&store, "u2");
        store.insert_profile(&profile("u1", "alice")).unwrap();
        store
            .create_repo(&repo("r1", "u1", true), &[file("r1", "a.txt", "a")])
            .unwrap();
        store.create_repo(&repo("r2", "u2", true), &[]).unwrap();
        store
            .create_comment(&Comment {
                id: "c1".to_string(),
                repo_id: "r2".to_string(),
                user_id: "u1".to_string(),
                content: "nice".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();

        store
            .create_session(&Session {
                id: "s1".to_string(),
                token_hash: "hash".to_string(),
                token_lookup: "lookup01".to_string(),
                identity_id: "u1".to_string(),
                created_at: Utc::now(),
                expires_at: Utc::now() + chrono::Duration::hours(1),
                last_used_at: None,
            })
            .unwrap();

        store.delete_account_data("u1").unwrap();

        assert!(store.get_identity("u1").unwrap().is_none());
        assert!(store.get_session_by_lookup("lookup01").unwrap().is_none());
        assert!(store.get_identity("u2").unwrap().is_some());
        assert!(store.get_profile("u1").unwrap().is_none());
        assert!(store.list_user_repos("u1").unwrap().is_empty());
        assert!(store.list_files("r1").unwrap().is_empty());
        assert!(store.get_comment("c1").unwrap().is_none());
        assert!(store.get_repo("r2").unwrap().is_some());
    }

    #[test]
    fn test_session_lookup_collision() {
        let (_temp, store) = setup();
        identity(&store, "u1");

        let session = |id: &str| Session {
            id: id.to_string(),
            token_hash: "hash".to_string(),
            token_lookup: "lookup12".to_string(),
            identity_id: "u1".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            last_used_at: None,
        };

        store.create_session(&session("s1")).unwrap();
        let result = store.create_session(&session("s2"));
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }

    #[test]
    fn test_delete_expired_sessions() {
        let (_temp, store) = setup();
        identity(&store, "u1");

        store
            .create_session(&Session {
                id: "s1".to_string(),
                token_hash: "hash".to_string(),
                token_lookup: "aaaaaaaa".to_string(),
                identity_id: "u1".to_string(),
                created_at: Utc::now(),
                expires_at: Utc::now() - chrono::Duration::hours(1),
                last_used_at: None,
            })
            .unwrap();

        assert_eq!(store.delete_expired_sessions().unwrap(), 1);
        assert!(store.get_session_by_lookup("aaaaaaaa").unwrap().is_none());
    }
}
