use anyhow::{anyhow, Result};
use clap::Args;
use std::io::Write;
use std::sync::Arc;
use txprobe::{Dispatcher, ProbeConfig};

/// Arguments for the Run command
#[derive(Args)]
pub struct RunArgs {
    /// Scenario to run, e.g. write_read_transaction
    #[clap(name = "SCENARIO")]
    pub scenario: String,

    /// Number of consecutive runs
    #[clap(short = 'n', long, default_value_t = 1)]
    pub times: u32,

    /// Recreate the database file before running
    #[clap(long)]
    pub reset: bool,
}

pub fn run(config: &ProbeConfig, args: RunArgs) -> Result<()> {
    let RunArgs {
        scenario,
        times,
        reset,
    } = args;

    let store = super::open_store(config, reset)?;
    let dispatcher = Dispatcher::new(Arc::new(store), config.sequencer_settings())
        .with_immediate_placeholder(config.immediate_placeholder);

    if !dispatcher.has_scenario(&scenario) {
        return Err(anyhow!(
            "unknown scenario '{}', expected one of: {}",
            scenario,
            dispatcher.scenario_names().join(", ")
        ));
    }

    let mut stdout = std::io::stdout();
    for _ in 0..times {
        let output = dispatcher.execute(&scenario)?;
        if let Err(e) = write!(stdout, "{}", output.render()) {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
            return Ok(());
        }
    }

    Ok(())
}
