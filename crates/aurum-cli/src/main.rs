mod commands;
mod infra;
mod obs;
mod output;

use clap::{Parser, Subcommand};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aurum")]
#[command(about = "Aurum pair paper-trading CLI", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  aurum tick --config configs/gld_gdx.toml\n  aurum schedule --config configs/gld_gdx.toml --every 1d\n  aurum validate --config configs/gld_gdx.toml\n  aurum history --config configs/gld_gdx.toml --limit 10\n  aurum report --config configs/gld_gdx.toml\n"
)]
struct Cli {
    /// Log level filter (AURUM_LOG overrides).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    /// Log format: text or json.
    #[arg(long, default_value = "text", global = true)]
    log_format: String,
    /// Expose Prometheus metrics on host:port.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run one scheduled evaluation tick.
    Tick {
        #[arg(long)]
        config: PathBuf,
    },
    /// Run ticks forever on a fixed interval (fallback scheduler).
    Schedule {
        #[arg(long)]
        config: PathBuf,
        /// Interval between ticks, e.g. 1d, 6h, 30m.
        #[arg(long, default_value = "1d")]
        every: String,
    },
    /// Check config, data quality, and journal consistency without trading.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
    /// Print recent journal entries.
    History {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a performance summary derived from the journal.
    Report {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() {
    output::print_banner();
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Tick { config } => Command::Tick { config },
        CliCommand::Schedule { config, every } => Command::Schedule { config, every },
        CliCommand::Validate { config } => Command::Validate { config },
        CliCommand::History { config, limit } => Command::History { config, limit },
        CliCommand::Report { config } => Command::Report { config },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
