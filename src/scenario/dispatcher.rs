//! Scenario dispatch
//!
//! The `Dispatcher` maintains a registry of scenario programs keyed by name
//! and runs the requested one against the shared store. Failures are logged
//! here with their full cause chain; callers only get a classified
//! [`DispatchError`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::database::{is_busy, Store};
use crate::scenario::{
    Output, Scenario, Sequencer, SequencerSettings, IMMEDIATE_PLACEHOLDER, SCENARIOS,
};

/// Classification of a failed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No scenario registered under the requested name
    UnknownScenario,
    /// Lock contention: busy timeout, busy snapshot, or locked table
    Busy,
    /// Any other SQLite failure
    Statement,
    /// Failure outside SQLite (poisoned lock, invalid transaction state)
    Internal,
}

/// Error returned by [`Dispatcher::execute`]
#[derive(Debug)]
pub enum DispatchError {
    UnknownScenario(String),
    Failed {
        scenario: &'static str,
        kind: ErrorKind,
        source: anyhow::Error,
    },
}

impl DispatchError {
    fn failed(scenario: &'static str, source: anyhow::Error) -> Self {
        let kind = if is_busy(&source) {
            ErrorKind::Busy
        } else if source
            .chain()
            .any(|cause| cause.downcast_ref::<rusqlite::Error>().is_some())
        {
            ErrorKind::Statement
        } else {
            ErrorKind::Internal
        };

        Self::Failed {
            scenario,
            kind,
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::UnknownScenario(_) => ErrorKind::UnknownScenario,
            DispatchError::Failed { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownScenario(name) => write!(f, "unknown scenario '{}'", name),
            DispatchError::Failed {
                scenario,
                kind,
                source,
            } => write!(f, "scenario '{}' failed ({:?}): {:#}", scenario, kind, source),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::UnknownScenario(_) => None,
            DispatchError::Failed { source, .. } => {
                let source: &(dyn std::error::Error + 'static) = source.as_ref();
                Some(source)
            }
        }
    }
}

/// Registry-based scenario dispatcher
pub struct Dispatcher {
    /// Shared storage handle used by every run
    store: Arc<Store>,

    /// Map from scenario name to program
    scenarios: HashMap<&'static str, Scenario>,

    /// Registration order, for listings
    order: Vec<&'static str>,

    settings: SequencerSettings,
}

impl Dispatcher {
    /// Create a dispatcher with every standard scenario registered
    pub fn new(store: Arc<Store>, settings: SequencerSettings) -> Self {
        let mut dispatcher = Self::empty(store, settings);
        for scenario in SCENARIOS {
            dispatcher.register(scenario);
        }
        dispatcher
    }

    /// Create a dispatcher with no scenarios registered
    pub fn empty(store: Arc<Store>, settings: SequencerSettings) -> Self {
        Self {
            store,
            scenarios: HashMap::new(),
            order: Vec::new(),
            settings,
        }
    }

    /// Serve the immediate scenario as a bare acknowledgment
    pub fn with_immediate_placeholder(mut self, enabled: bool) -> Self {
        if enabled {
            self.register(IMMEDIATE_PLACEHOLDER);
        }
        self
    }

    /// Register a scenario, replacing any program with the same name
    pub fn register(&mut self, scenario: Scenario) -> &mut Self {
        if self.scenarios.insert(scenario.name, scenario).is_none() {
            self.order.push(scenario.name);
        }
        self
    }

    pub fn has_scenario(&self, name: &str) -> bool {
        self.scenarios.contains_key(name)
    }

    pub fn scenario_names(&self) -> Vec<&'static str> {
        self.order.clone()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Run the scenario registered under `name`
    ///
    /// Blocks on SQLite; async callers should run it on a blocking thread.
    pub fn execute(&self, name: &str) -> Result<Output, DispatchError> {
        let scenario = self
            .scenarios
            .get(name)
            .ok_or_else(|| DispatchError::UnknownScenario(name.to_string()))?;

        debug!("Running scenario {}: {}", scenario.name, scenario.describe());
        Sequencer::new(&self.store, &self.settings)
            .run(scenario)
            .map_err(|e| {
                let err = DispatchError::failed(scenario.name, e);
                error!("{}", err);
                err
            })
    }
}
