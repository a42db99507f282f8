pub mod list;
pub mod run;
pub mod serve;

use anyhow::Result;
use txprobe::{ProbeConfig, Store};

/// Open the configured store, recreating the file first when `reset` is set
pub(crate) fn open_store(config: &ProbeConfig, reset: bool) -> Result<Store> {
    let path = config.sqlite_path();
    let settings = config.session_settings();

    if reset {
        Store::bootstrap(path, settings)
    } else {
        Store::open(path, settings)
    }
}
