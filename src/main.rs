mod cli;

use brakewatch::{
    config,
    conversion::{JobRunner, JobSupervisor},
    hub::StatusHub,
    server::{self, AppContext},
    watch,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

struct StartArgs {
    watch_dir: PathBuf,
    output_dir: PathBuf,
    source_dir: PathBuf,
    delete: Option<bool>,
    static_dir: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
}

async fn start(args: StartArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI arguments override the config file
    config.watch.input_dir = args.watch_dir;
    config.watch.output_dir = args.output_dir;
    config.watch.source_dir = args.source_dir;
    if let Some(delete) = args.delete {
        config.watch.delete_on_completion = delete;
    }
    if let Some(dir) = args.static_dir {
        config.server.static_dir = dir;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting brakewatch");
    tracing::info!(
        "Watching {} -> {} (delete on completion: {})",
        config.watch.input_dir.display(),
        config.watch.output_dir.display(),
        config.watch.delete_on_completion
    );

    tokio::fs::create_dir_all(&config.watch.output_dir)
        .await
        .with_context(|| format!("Failed to create output dir {:?}", config.watch.output_dir))?;

    let hub = StatusHub::spawn();
    let ctx = AppContext::new(hub.clone(), config.clone());

    let runner = JobRunner::new(&config.transcoder, &config.watch.output_dir);
    let supervisor = JobSupervisor::new(runner, hub, config.watch.delete_on_completion);

    let mut watcher =
        watch::FileWatcher::new(&config.watch.input_dir, ctx.matcher.clone(), supervisor);
    let consumer = watcher
        .start()
        .context("Failed to start directory watcher")?;

    let server_result = server::start_server(ctx).await;

    tracing::info!("Shutting down...");
    watcher.stop();
    consumer.abort();

    server_result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "brakewatch=trace,brakewatch_common=debug,tower_http=debug".to_string()
        } else {
            "brakewatch=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            watch_dir,
            output_dir,
            source_dir,
            delete,
            static_dir,
            host,
            port,
        } => {
            let args = StartArgs {
                watch_dir,
                output_dir,
                source_dir,
                delete,
                static_dir,
                host,
                port,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start(args, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("brakewatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let program = &config.transcoder.program;

    println!("Checking external tools...\n");

    match which::which(program) {
        Ok(path) => {
            println!("✓ {} - {}", program, path.display());
            println!("\nAll required tools are available!");
        }
        Err(_) => {
            println!("✗ {}", program);
            println!("\nThe transcoder is missing. Install it or set transcoder.program.");
        }
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Watch dir: {}", config.watch.input_dir.display());
            println!("  Output dir: {}", config.watch.output_dir.display());
            println!("  Extensions: {}", config.watch.matcher().extensions().join(", "));
            println!(
                "  Transcoder: {} (preset {})",
                config.transcoder.program, config.transcoder.preset
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
