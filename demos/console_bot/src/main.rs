//! Console Bot Demo
//!
//! Type commands on stdin, read responses on stdout. Logs go to stderr.
//!
//! ```text
//! $ cargo run --package console-bot -- --user root --admin root
//! /ping
//! pong
//! /adm b mallory spamming
//! banned mallory: spamming
//! /admin
//! Command: admin
//! Description: Moderation commands
//! ...
//! ```
//!
//! Piped input works too; the bot exits once stdin is exhausted:
//!
//! ```bash
//! printf '/count\n/count\n/whoami\n' | cargo run --package console-bot
//! ```

mod adapters;
mod plugins;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use switchboard::prelude::*;
use switchboard::runtime::LoggingBuilder;
use switchboard::runtime::config::LogOutput;
use tracing::{Level, info};

use adapters::{ConsoleAdapter, LogAdapter};
use plugins::{AdminPlugin, UtilPlugin, audit};

/// Switchboard console bot
#[derive(Parser)]
#[command(name = "console-bot")]
#[command(about = "A stdin/stdout bot with nested commands, aliases and middleware")]
#[command(version)]
struct Cli {
    /// Name the console user chats as
    #[arg(long, default_value = "you")]
    user: String,

    /// Users allowed to run admin commands (repeatable)
    #[arg(long = "admin", default_value = "you")]
    admins: Vec<String>,

    /// Configuration file (switchboard.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Command prefix, overriding the configuration
    #[arg(long)]
    prefix: Option<String>,

    /// Worker pool size, overriding the configuration
    #[arg(long)]
    workers: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Installed before the engine so its own logging setup is skipped and
    // stdout stays reserved for responses.
    LoggingBuilder::new()
        .with_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .output(LogOutput::Stderr)
        .init();

    let mut builder = Engine::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(prefix) = cli.prefix {
        builder = builder.command_prefix(prefix);
    }
    if let Some(workers) = cli.workers {
        builder = builder.worker_pool_size(workers);
    }
    let engine = builder.build()?;

    let middlewares = [audit()];
    engine.register_plugin(Arc::new(AdminPlugin::new(cli.admins)), &middlewares);
    engine.register_plugin(Arc::new(UtilPlugin), &middlewares);

    let shutdown = CancellationToken::new();
    engine.register_adapter(Arc::new(ConsoleAdapter::new(&cli.user, shutdown.clone())));
    engine.register_adapter(Arc::new(LogAdapter));

    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            on_signal.cancel();
        }
    });

    let commands: Vec<String> = engine
        .registry()
        .commands()
        .iter()
        .map(|command| command.name().to_string())
        .collect();
    info!(
        commands = ?commands,
        prefix = %engine.config().command_prefix,
        "Console bot ready"
    );
    engine.run(shutdown).await?;

    Ok(())
}
