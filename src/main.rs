//! Cumplir CLI — declarative package-state reconciliation.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "cumplir",
    version,
    about = "Declarative package-state reconciliation — SLS-style policies, retry-aware apply"
)]
struct Cli {
    #[command(subcommand)]
    command: cumplir::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = cumplir::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
