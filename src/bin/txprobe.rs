use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use txprobe::ProbeConfig;

mod commands;

use commands::run::RunArgs;
use commands::serve::ServeArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default ./txprobe.toml is used when present
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recreate the database and serve one HTTP route per scenario (default).
    Serve(ServeArgs),

    /// Run a scenario in-process against the configured database and print its output.
    Run(RunArgs),

    /// List the scenarios and their step sequences.
    List,
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        // filter spans/events with level INFO (or DEBUG with --debug) or higher.
        .with_max_level(level)
        .init();

    let config = match ProbeConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    debug!("Effective configuration:\n{}", config.summary());

    let result = match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => commands::serve::run(&config, args),
        Commands::Run(args) => commands::run::run(&config, args),
        Commands::List => {
            commands::list::run(&config);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
