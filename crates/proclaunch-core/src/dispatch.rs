//! Strategy selection over the parameter catalog.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{LaunchError, Result};
use crate::params::LaunchProvider;
use crate::strategy::{LaunchReport, LaunchStrategy};

/// Owns the ordered strategy set and picks the one to run.
///
/// The set is read-only after construction, so the dispatcher is safe for
/// concurrent reads. Selection returns the first registered strategy whose
/// capability set covers every supplied knob; registration order is the
/// tie-break, there is no best-fit scoring.
pub struct StrategyDispatcher {
    strategies: Vec<Arc<dyn LaunchStrategy>>,
}

impl StrategyDispatcher {
    pub fn new(strategies: Vec<Arc<dyn LaunchStrategy>>) -> Self {
        debug!(
            strategies = strategies.len(),
            "initialized launch strategy registry"
        );
        Self { strategies }
    }

    /// Names of the registered strategies, in registration order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Pick the first registered strategy that covers everything the
    /// provider supplies, or report the capability-negotiation failure.
    pub fn select(&self, provider: &dyn LaunchProvider) -> Result<&dyn LaunchStrategy> {
        let requested = provider.provided_params();
        match self.strategies.iter().find(|s| s.covers(provider)) {
            Some(strategy) => {
                debug!(
                    strategy = strategy.name(),
                    requested = ?requested,
                    "selected launch strategy"
                );
                Ok(strategy.as_ref())
            }
            None => {
                warn!(requested = ?requested, "no launch strategy covers the requested parameters");
                Err(LaunchError::UnsupportedParameterSet { requested })
            }
        }
    }

    /// Select and execute in one step.
    pub fn launch(&self, provider: &dyn LaunchProvider) -> Result<LaunchReport> {
        self.select(provider)?.execute(provider)
    }
}
