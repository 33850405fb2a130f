use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use repokeep::{cleanup, pipeline, project, CheckOptions, CleanupOptions, Config, PhaseError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, Level};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Clean workspace caches and run the pre-commit lint, format and test gate",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Project root (defaults to the nearest project above the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Show what would be removed or run, without doing it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Show debug diagnostics on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove caches, bytecode and coverage output; reset runtime data directories
    Clean {
        /// Also delete local secrets files such as .env
        #[arg(long)]
        remove_secrets: bool,
    },
    /// Run cleanup, lint with autofix, format and tests, then show VCS status
    Check {
        /// Keep local secrets files when the built-in cleanup runs
        #[arg(long)]
        keep_secrets: bool,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let root = project::resolve_root(args.root.as_deref())?;
    debug!(root = %root.display(), "resolved project root");
    let config = Config::load(&root)?;

    match args.command {
        Commands::Clean { remove_secrets } => {
            let options = CleanupOptions {
                remove_secrets,
                dry_run: args.dry_run,
            };
            let report = cleanup::run(&root, &config, options)?;
            report.print_summary(args.dry_run);
            println!("{}", "Cleanup complete.".green());
            Ok(())
        }
        Commands::Check { keep_secrets } => {
            let options = CheckOptions {
                remove_secrets: !keep_secrets,
                dry_run: args.dry_run,
            };
            pipeline::run_check(&root, &config, options)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(phase_err) = err.downcast_ref::<PhaseError>() {
                eprintln!("{}", phase_err.to_string().red());
                return ExitCode::from(phase_err.exit_code());
            }
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
