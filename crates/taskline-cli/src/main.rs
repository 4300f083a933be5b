use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use taskline_core::config::resolve_data_file_with_source;
use taskline_core::session::Repl;
use taskline_core::storage::{JsonFileStorage, MemoryStorage, Storage};
use taskline_core::store::TaskStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskline", version, about = "Interactive line-oriented task tracker")]
struct Cli {
    /// Task file to use instead of the configured one
    #[arg(short, long, env = "TASKLINE_FILE")]
    file: Option<PathBuf>,
    /// Keep tasks in memory only; nothing is read or written
    #[arg(long, conflicts_with = "file")]
    memory: bool,
    /// Log debug output to stderr (overridden by TASKLINE_LOG)
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(Command::Version) = cli.command {
        println!("taskline {}", taskline_core::version());
        return Ok(());
    }

    let storage: Box<dyn Storage> = if cli.memory {
        info!("using in-memory storage");
        Box::new(MemoryStorage::new())
    } else {
        let cwd = std::env::current_dir().context("resolve working directory")?;
        let (path, source) = resolve_data_file_with_source(&cwd, cli.file.as_deref());
        info!(path = %path.display(), source = source.as_str(), "using data file");
        Box::new(JsonFileStorage::new(path))
    };

    let (store, load_error) = TaskStore::open(storage);
    let mut repl = Repl::new(store).context("build command registry")?;
    repl.run(io::stdin().lock(), io::stdout().lock(), load_error.as_ref())
        .context("run session")?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TASKLINE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "taskline=debug,taskline_core=debug"
        } else {
            "warn"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
