//! The high-level launcher: validation, dispatch, logging, and observer
//! notification for one launch attempt at a time.

use tracing::{info, warn};

use proclaunch_core::{
    LaunchReport, LaunchRequest, ObserverSet, Result, StrategyDispatcher,
};

use crate::platform::platform_dispatcher;

/// Owns the strategy registry for its lifetime and an observer set for
/// failure notification.
pub struct Launcher {
    dispatcher: StrategyDispatcher,
    observers: ObserverSet,
}

impl Launcher {
    pub fn new(dispatcher: StrategyDispatcher) -> Self {
        Self {
            dispatcher,
            observers: ObserverSet::new(),
        }
    }

    /// A launcher over this platform's strategy set.
    pub fn with_platform_strategies() -> Self {
        Self::new(platform_dispatcher())
    }

    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    pub fn dispatcher(&self) -> &StrategyDispatcher {
        &self.dispatcher
    }

    /// Validate, select a strategy, and execute. Every failure is delivered
    /// to the subscribed observers before it is returned.
    pub fn launch(&self, request: &LaunchRequest) -> Result<LaunchReport> {
        info!(
            application_path = request.application_path.as_deref().unwrap_or_default(),
            "launch requested"
        );
        let outcome = request
            .validate()
            .and_then(|_| self.dispatcher.launch(request));
        match &outcome {
            Ok(report) => info!(
                process_id = report.process_id,
                suspended = report.left_suspended,
                "launch complete"
            ),
            Err(error) => {
                warn!(%error, "launch failed");
                self.observers.notify(error);
            }
        }
        outcome
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::with_platform_strategies()
    }
}
