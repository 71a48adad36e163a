use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use repofy::auth::LocalIdentityProvider;
use repofy::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG_TEMPLATE, FileConfig, ServerConfig};
use repofy::server::{AppState, create_router};
use repofy::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "repofy")]
#[command(about = "A small self-hostable code-sharing server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataDirArg {
    /// Data directory for the database and config file
    #[arg(long, env = "REPOFY_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, database and default config file
    Init {
        #[command(flatten)]
        data: DataDirArg,
    },

    /// Start the server
    Serve {
        #[command(flatten)]
        data: DataDirArg,

        /// Host to bind to
        #[arg(long, env = "REPOFY_HOST")]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short, env = "REPOFY_PORT")]
        port: Option<u16>,

        /// Upper bound for a single request, in seconds
        #[arg(long, env = "REPOFY_REQUEST_TIMEOUT_SECS")]
        request_timeout_secs: Option<u64>,

        /// Browser origin allowed to call the API (e.g., "http://localhost:3000")
        #[arg(long, env = "REPOFY_CORS_ORIGIN")]
        cors_origin: Option<String>,
    },
}

fn run_init(data_dir: PathBuf) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    let db_path = config.db_path();

    if db_path.exists() {
        bail!(
            "Server already initialized. Database exists at: {}",
            db_path.display()
        );
    }

    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let config_path = config.data_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;
    }

    println!("Initialized database at {}", db_path.display());
    println!("Settings can be changed in {}", config_path.display());

    Ok(())
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!("Server not initialized. Run 'repofy init' first to create the database.");
    }

    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&db_path)?);
    store.initialize()?;

    let identity = Arc::new(LocalIdentityProvider::new(
        store.clone(),
        config.session_ttl_hours,
    ));

    let addr = config.socket_addr()?;
    let state = Arc::new(AppState {
        store,
        identity,
        config,
    });

    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("repofy=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data } => run_init(data.data_dir)?,
        Commands::Serve {
            data,
            host,
            port,
            request_timeout_secs,
            cors_origin,
        } => {
            let file = FileConfig::load(&data.data_dir)?;
            let mut config = ServerConfig {
                data_dir: data.data_dir,
                ..ServerConfig::default()
            }
            .with_file(file);

            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(secs) = request_timeout_secs {
                config.request_timeout_secs = secs;
            }
            if cors_origin.is_some() {
                config.cors_origin = cors_origin;
            }
            config.validate()?;

            run_serve(config).await?;
        }
    }

    Ok(())
}
