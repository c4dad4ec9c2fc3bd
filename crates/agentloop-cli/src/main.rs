use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

mod backend_select;
mod cli;
mod run_cmd;
mod status_cmd;

use agentloop_config::LoopConfig;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let workspace = resolve_workspace(cli.workspace.as_deref())?;
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| workspace.join("agentloop.toml"));
    let config = LoopConfig::load(&config_path).context("loading loop configuration")?;

    let _file_guard = init_logging(&config, &workspace);

    match cli.command {
        Commands::Start { spec_file, backend_url, model } => {
            let spec = std::fs::read_to_string(&spec_file)
                .with_context(|| format!("reading specification file: {spec_file}"))?;
            let backend = backend_select::select_backend(&config.model, backend_url.as_deref(), model.as_deref())?;
            run_cmd::start(&workspace, spec, config, backend).await?;
        }
        Commands::Resume { backend_url, model } => {
            let backend = backend_select::select_backend(&config.model, backend_url.as_deref(), model.as_deref())?;
            run_cmd::resume(&workspace, config, backend).await?;
        }
        Commands::Status => {
            status_cmd::print_status(&workspace)?;
        }
        Commands::Pause => {
            status_cmd::pause(&workspace)?;
        }
    }

    Ok(())
}

fn resolve_workspace(override_dir: Option<&str>) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => std::env::current_dir().context("determining current directory"),
    }
}

/// Initializes stderr logging (always on) plus an optional rolling file
/// sink per `monitoring.log_file`. Returns the file appender's guard, which
/// must stay alive for the duration of `main` or buffered lines are lost on
/// exit.
fn init_logging(config: &LoopConfig, workspace: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.monitoring.log_level));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.monitoring.log_file.as_ref() {
        Some(log_file) => {
            let path = Path::new(log_file);
            let (dir, file_name) = match (path.parent(), path.file_name()) {
                (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => {
                    (dir.to_path_buf(), name.to_os_string())
                }
                _ => (workspace.to_path_buf(), path.as_os_str().to_os_string()),
            };
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()
                .ok();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(env_filter).with(stderr_layer).try_init().ok();
            None
        }
    }
}
