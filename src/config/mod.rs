mod server;

pub use server::{
    CONFIG_FILE_NAME, DEFAULT_CONFIG_TEMPLATE, FileConfig, MAX_SESSION_TTL_HOURS, ServerConfig,
};
