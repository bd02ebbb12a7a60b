use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use filecheck::cli::{Cli, Commands};
use filecheck::error::Interrupted;
use filecheck::fs::OsFileSystem;
use filecheck::{FilecheckContext, commands, output};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::io::{self, Write};
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "FILECHECK_LOG";

fn main() {
    if let Err(e) = run() {
        if e.downcast_ref::<Interrupted>().is_some() {
            println!("\nOperation cancelled by user");
        } else {
            output::error(&format!("{e:#}"));
        }
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Completion { shell } => print_completions(shell, &mut Cli::command()),
        command => {
            let mut ctx = FilecheckContext::new(cli.config.as_deref())?;
            ctx.verbose = cli.verbose;
            register_interrupts(&ctx);
            execute(&ctx, command)?;
        }
    }

    Ok(())
}

fn execute(ctx: &FilecheckContext, command: Commands) -> Result<()> {
    let fs = OsFileSystem;
    let mut out = io::stdout().lock();

    match command {
        Commands::Generate { walk } => {
            let options = ctx.walk_options(walk.recursive, walk.follow_links);
            let summary = commands::generate::execute(ctx, &fs, &walk.directory, &options, &mut out)?;
            info!(?summary, "generate finished");
        }
        Commands::Check {
            walk,
            show_same_files,
            signals,
            ignore_hash,
        } => {
            let options = ctx.walk_options(walk.recursive, walk.follow_links);
            let check = signals.check_options(show_same_files, ignore_hash);
            let summary =
                commands::check::execute(ctx, &fs, &walk.directory, &options, &check, &mut out)?;
            info!(?summary, "check finished");
        }
        Commands::Update { walk, signals } => {
            let options = ctx.walk_options(walk.recursive, walk.follow_links);
            let update = signals.update_options();
            let summary =
                commands::update::execute(ctx, &fs, &walk.directory, &options, &update, &mut out)?;
            info!(?summary, "update finished");
        }
        Commands::Completion { .. } => {}
    }

    out.flush()?;
    Ok(())
}

/// Logs go to stderr; `FILECHECK_LOG` overrides the level picked by `-v`.
fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

/// SIGINT and SIGTERM stop the walk at the next entry.
fn register_interrupts(ctx: &FilecheckContext) {
    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, ctx.interrupt_flag()) {
            output::warning(&format!("failed to register handler for signal {signal}: {e}"));
        }
    }
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
