//! lfv server binary
//!
//! Serves a browser file viewer API over one sandboxed folder.
//!
//! ## Usage
//!
//! ```bash
//! # Browse ~/notes, allow moving anywhere under the home directory
//! LFV_DEFAULT_FOLDER=~/notes LFV_ROOT_FOLDER=~ lfv-server
//!
//! # Same with flags, on another port
//! lfv-server --folder ~/notes --root ~ --bind 127.0.0.1:8080
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lfv_kernel::Config;
use lfv_server::AppState;

#[derive(Debug, Parser)]
#[command(name = "lfv-server", version, about = "Browse, preview and search a sandboxed folder")]
struct Args {
    /// Folder opened at startup
    #[arg(long, env = "LFV_DEFAULT_FOLDER")]
    folder: Option<PathBuf>,

    /// Outermost folder the viewer may reach (defaults to --folder)
    #[arg(long, env = "LFV_ROOT_FOLDER")]
    root: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "LFV_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Deadline for one external search tool run, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    search_timeout_ms: u64,

    /// Skip ripgrep for content search
    #[arg(long)]
    no_ripgrep: bool,

    /// Skip find for filename search
    #[arg(long)]
    no_find: bool,

    /// Entries each cache table holds before evicting
    #[arg(long, default_value_t = 1024)]
    cache_capacity: usize,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::default();
        config.sandbox.base = self.folder;
        config.sandbox.root = self.root;
        config.tree.cache_capacity = self.cache_capacity;
        config.search.timeout = Duration::from_millis(self.search_timeout_ms);
        config.search.use_ripgrep = !self.no_ripgrep;
        config.search.use_find = !self.no_find;
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let bind = args.bind;

    match run(args.into_config(), bind).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, bind: SocketAddr) -> anyhow::Result<()> {
    let state = AppState::new(&config)?;
    tracing::info!(
        root = %state.sandbox.root().display(),
        base = %state.sandbox.base().display(),
        "sandbox ready"
    );
    lfv_server::serve(Arc::new(state), bind).await
}
