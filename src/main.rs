mod api;
mod auth;
mod cli;
mod config;
mod error;
mod forms;
mod pages;
mod routes;
mod session;
mod storage;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stockroom", about = "Inventory management client")]
pub struct Args {
    #[arg(long, env = "STOCKROOM_API_URL", help = "Backend base URL")]
    pub base_url: Option<String>,

    #[arg(long, value_name = "DIALECT", help = "Backend contract: flag or entity")]
    pub dialect: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Session storage file")]
    pub storage: Option<PathBuf>,

    #[arg(long, help = "Keep the session in memory only")]
    pub ephemeral: bool,

    #[arg(long, help = "Debug output (print HTTP requests and settings)")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in; prompts for anything not given
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List all products
    List,
    /// Show one product
    Show { id: u64 },
    /// Add a product; prompts unless --name and --price are given
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        stock: Option<String>,
    },
    /// Edit a product; prompts unless a field is given
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        stock: Option<String>,
    },
    /// Open a page by route, e.g. /products/3/edit
    Open { route: String },
}

fn init_logging(debug: bool) {
    let default = if debug { "stockroom=debug" } else { "stockroom=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.debug);

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable config, using defaults");
            config::Config::default()
        })
    };

    if let Some(base_url) = &args.base_url {
        cfg.api.base_url = base_url.clone();
    }
    if let Some(dialect_str) = &args.dialect {
        cfg.api.dialect = config::Dialect::from_str(dialect_str).ok_or_else(|| {
            anyhow::anyhow!("Invalid dialect: {}. Use: flag, entity", dialect_str)
        })?;
    }
    if let Some(path) = &args.storage {
        cfg.storage.path = Some(path.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!("Invalid configuration"));
    }

    tracing::debug!(
        base_url = %cfg.api.base_url,
        dialect = cfg.api.dialect.as_str(),
        "configuration loaded"
    );

    let storage_path = (!args.ephemeral).then(|| cfg.storage.resolve_path());
    let store: Box<dyn storage::Storage> = match &storage_path {
        Some(path) => {
            let file = storage::FileStorage::open(path)?;
            tracing::debug!(path = %file.path().display(), "opened session storage");
            Box::new(file)
        }
        None => Box::new(storage::MemoryStorage::default()),
    };

    let sessions = session::SessionStore::new(store, cfg.api.dialect.session_layout());
    let transport = api::HttpTransport::new(&cfg.api.base_url);
    let client = api::ApiClient::new(transport, cfg.api.dialect, sessions);

    let ctx = cli::Context {
        auth: auth::AuthContext::new(client),
        storage_path,
        config: cfg,
    };

    match args.command {
        Some(command) => cli::run_once(ctx, command),
        None => cli::run_repl(ctx),
    }
}
