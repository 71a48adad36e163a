use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "repofy.toml";

const DEFAULT_MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

/// Longest session lifetime accepted, one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Upper bound for a single request, including store calls.
    pub request_timeout_secs: u64,
    pub session_ttl_hours: i64,
    /// Decoded size limit for base64 avatar uploads.
    pub max_avatar_bytes: usize,
    /// Browser origin allowed to call the API (e.g., "http://localhost:3000").
    pub cors_origin: Option<String>,
}

/// Optional settings read from `<data_dir>/repofy.toml`. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_secs: Option<u64>,
    pub session_ttl_hours: Option<i64>,
    pub max_avatar_bytes: Option<usize>,
    pub cors_origin: Option<String>,
}

impl FileConfig {
    /// Loads the config file from the data dir. A missing file yields the empty config.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("repofy.db")
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Layers file settings over the defaults. Values already set on the command
    /// line are applied afterwards by the caller.
    #[must_use]
    pub fn with_file(mut self, file: FileConfig) -> Self {
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(hours) = file.session_ttl_hours {
            self.session_ttl_hours = hours;
        }
        if let Some(bytes) = file.max_avatar_bytes {
            self.max_avatar_bytes = bytes;
        }
        if file.cors_origin.is_some() {
            self.cors_origin = file.cors_origin;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".into()));
        }
        if self.session_ttl_hours <= 0 {
            return Err(Error::Config("session_ttl_hours must be positive".into()));
        }
        if self.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(Error::Config(format!(
                "session_ttl_hours must be at most {MAX_SESSION_TTL_HOURS}"
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            data_dir: PathBuf::from("./data"),
            request_timeout_secs: 10,
            session_ttl_hours: 24,
            max_avatar_bytes: DEFAULT_MAX_AVATAR_BYTES,
            cors_origin: Some("http://localhost:3000".to_string()),
        }
    }
}

/// Commented template written by `repofy init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Repofy server settings. Command-line flags and REPOFY_* variables take precedence.

# host = "127.0.0.1"
# port = 4000
# request_timeout_secs = 10
# session_ttl_hours = 24
# max_avatar_bytes = 2097152
# cors_origin = "http://localhost:3000"
"#;
