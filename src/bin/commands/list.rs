use txprobe::scenario::IMMEDIATE_PLACEHOLDER;
use txprobe::{ProbeConfig, SCENARIOS};

pub fn run(config: &ProbeConfig) {
    let width = SCENARIOS.iter().map(|s| s.name.len()).max().unwrap_or(0);

    for scenario in SCENARIOS {
        let placeholder =
            config.immediate_placeholder && scenario.name == IMMEDIATE_PLACEHOLDER.name;
        let scenario = if placeholder {
            IMMEDIATE_PLACEHOLDER
        } else {
            scenario
        };
        println!(
            "{:<width$}  {}",
            scenario.name,
            scenario.describe(),
            width = width
        );
    }
}
