// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Midway - discover, catalog and hot-reload middleware units.
//!
//! This is the command-line surface over the middleware host.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod presentation;
mod scaffold;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use midway_config::MidwayConfig;
use midway_core::{IdentityPipeline, MidwayError, ProcessingContext};
use midway_runtime::MiddlewareHost;

use crate::presentation::{ErrorChannel, PresentationAdapter, StderrChannel};

/// Midway - discover, catalog and hot-reload middleware units.
#[derive(Parser, Debug)]
#[command(name = "midway", version, about, long_about = None)]
struct Cli {
    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List selectable middleware, naturally sorted.
    List,
    /// Rediscover middleware and update the catalog.
    Refresh,
    /// Show a middleware's description and default configuration.
    Show {
        /// Selection string, e.g. "Example Middleware (example_middleware)".
        selection: String,
    },
    /// Reload and run a middleware against a processing context.
    Run {
        /// Selection string, e.g. "Example Middleware (example_middleware)".
        selection: Option<String>,
        /// Configuration JSON, or @path to read it from a file.
        #[arg(long)]
        config: Option<String>,
        /// Processing context JSON, or @path to read it from a file.
        #[arg(long)]
        context: Option<String>,
    },
    /// Scaffold a new passthrough middleware module.
    Init {
        /// Module directory name.
        name: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match midway_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            midway_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.host.log_level);

    let Some(command) = cli.command else {
        println!("midway: use --help for available commands");
        return;
    };

    let channel = StderrChannel::new(cli.plain);
    if let Err(e) = run_command(command, config, &channel).await {
        channel.report(&e);
    }
    if channel.reported() > 0 {
        std::process::exit(1);
    }
}

async fn run_command(
    command: Commands,
    config: MidwayConfig,
    channel: &StderrChannel,
) -> Result<(), MidwayError> {
    match command {
        Commands::Init { name } => {
            let root = config
                .host
                .plugin_roots()
                .into_iter()
                .next()
                .ok_or_else(|| MidwayError::Config("no plugin_dirs configured".to_string()))?;
            let dir = scaffold::scaffold_module(&name, &root)?;
            println!("created {}", dir.display());
        }
        Commands::List => {
            let host = start_host(config)?;
            print_choices(&PresentationAdapter::new(&host, channel).choices());
        }
        Commands::Refresh => {
            let host = start_host(config)?;
            let choices = PresentationAdapter::new(&host, channel).refresh();
            println!(
                "catalog: {} ({} middleware)",
                host.catalog_store().path().display(),
                choices.len()
            );
            print_choices(&choices);
        }
        Commands::Show { selection } => {
            let host = start_host(config)?;
            if let Some(panel) = PresentationAdapter::new(&host, channel).on_change(&selection) {
                println!("{}", panel.info);
                println!();
                println!("{}", panel.config_text);
            }
        }
        Commands::Run {
            selection,
            config: config_arg,
            context,
        } => {
            let config_text = config_arg.as_deref().map(read_arg).transpose()?.unwrap_or_default();
            let context = match context.as_deref().map(read_arg).transpose()? {
                Some(text) => serde_json::from_str(&text)
                    .map(ProcessingContext)
                    .map_err(|e| MidwayError::Config(format!("invalid --context JSON: {e}")))?,
                None => ProcessingContext(serde_json::Value::Object(Default::default())),
            };
            let host = start_host(config)?;
            let adapter = PresentationAdapter::new(&host, channel);
            if let Some(result) = adapter.on_run(selection.as_deref(), &config_text, context).await {
                let text = serde_json::to_string_pretty(&result.0)
                    .map_err(|e| MidwayError::Internal(format!("failed to render result: {e}")))?;
                println!("{text}");
            }
        }
    }
    Ok(())
}

/// Discovers units and writes the catalog. `init` never gets here.
fn start_host(config: MidwayConfig) -> Result<MiddlewareHost, MidwayError> {
    MiddlewareHost::start(config, Arc::new(IdentityPipeline))
}

fn print_choices(choices: &[String]) {
    if choices.is_empty() {
        println!("  (no middleware found)");
    }
    for choice in choices {
        println!("  {choice}");
    }
}

/// Returns `value`, or the contents of the file it names when it starts with `@`.
fn read_arg(value: &str) -> Result<String, MidwayError> {
    match value.strip_prefix('@') {
        Some(path) => {
            let path = std::path::Path::new(path);
            std::fs::read_to_string(path).map_err(|e| MidwayError::io("read", path, e))
        }
        None => Ok(value.to_string()),
    }
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "midway={log_level},midway_plugin={log_level},midway_runtime={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc can advance the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_missing_selection() {
        let cli = Cli::try_parse_from(["midway", "run", "--config", "{}"]).unwrap();
        match cli.command {
            Some(Commands::Run { selection, config, .. }) => {
                assert!(selection.is_none());
                assert_eq!(config.as_deref(), Some("{}"));
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn read_arg_reads_files_with_at_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.json");
        std::fs::write(&path, r#"{"prompt":"x"}"#).unwrap();

        assert_eq!(read_arg(&format!("@{}", path.display())).unwrap(), r#"{"prompt":"x"}"#);
        assert_eq!(read_arg("{}").unwrap(), "{}");
        assert!(read_arg("@/definitely/not/here.json").is_err());
    }

    #[tokio::test]
    async fn init_scaffolds_without_touching_the_catalog() {
        let tree = midway_test_utils::PluginTree::new();
        let channel = StderrChannel::new(true);
        let command = Commands::Init {
            name: "fresh".to_string(),
        };

        run_command(command, tree.config(), &channel).await.unwrap();

        assert!(tree.root().join("fresh").join("middleware.toml").is_file());
        assert!(!tree.catalog_path().exists());
        assert_eq!(channel.reported(), 0);
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = midway_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.host.plugin_dirs, vec!["middleware"]);
    }
}
