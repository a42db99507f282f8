//! Scenario Walkthrough Example
//!
//! This example bootstraps a throwaway probe database and runs every scenario
//! once, printing what each one returns. It then holds the writer lock from a
//! second session to show which scenarios are blocked by it.
//!
//! # Running
//!
//! ```bash
//! cargo run --example scenario_walkthrough --features database
//! ```

use std::sync::Arc;
use std::time::Duration;

use txprobe::{Dispatcher, SequencerSettings, SessionSettings, Store, TxMode, SCENARIOS};

fn main() -> anyhow::Result<()> {
    println!("=== txprobe Scenario Walkthrough ===\n");

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("walkthrough.sqlite3");
    let settings = SessionSettings::with_busy_timeout(Duration::from_millis(100));
    let store = Store::bootstrap(&path, settings)?;
    println!("Bootstrapped {}\n", path.display());

    let dispatcher = Dispatcher::new(Arc::new(store), SequencerSettings::default());

    println!("1. Every scenario on a free database:");
    for scenario in SCENARIOS {
        let output = dispatcher.execute(scenario.name)?;
        println!(
            "   {:<34} {} row(s) rendered",
            scenario.name,
            output.render().lines().filter(|l| l.starts_with("name:")).count()
        );
    }
    println!("   rows stored: {}", dispatcher.store().count()?);

    println!("\n2. Same scenarios while another session holds BEGIN IMMEDIATE:");
    let holder = dispatcher.store().begin(TxMode::Immediate)?;
    for scenario in SCENARIOS {
        match dispatcher.execute(scenario.name) {
            Ok(_) => println!("   {:<34} ok", scenario.name),
            Err(e) => println!("   {:<34} {:?}", scenario.name, e.kind()),
        }
    }
    drop(holder);

    println!("\n   rows stored: {}", dispatcher.store().count()?);
    Ok(())
}
