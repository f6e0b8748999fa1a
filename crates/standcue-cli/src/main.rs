use clap::{CommandFactory, Parser, Subcommand};
use standcue_core::AppConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod player;

#[derive(Parser)]
#[command(name = "standcue", version, about = "Stand-up habit trainer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reminder session
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Profile settings and app configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Session history totals
    Stats(commands::stats::StatsArgs),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Log to stderr. `STANDCUE_LOG` wins over the configured filter.
fn init_logging() {
    let env_filter = EnvFilter::try_from_env("STANDCUE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(AppConfig::load_or_default().log_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "standcue", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
