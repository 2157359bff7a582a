//! Launch strategy abstraction.

use crate::error::Result;
use crate::params::{LaunchParam, LaunchProvider};

/// What a completed launch attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchReport {
    pub process_id: u32,
    /// True when the caller asked for suspended creation and the initial
    /// thread was therefore never resumed.
    pub left_suspended: bool,
}

/// One concrete mechanism for creating an OS process.
///
/// `supports` is a pure function of the parameter catalog and declares the
/// knob subset this mechanism can honor. `execute` may only be invoked when
/// every knob the provider supplies is supported; violating that is a
/// caller contract breach, not a runtime-recoverable condition.
pub trait LaunchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, param: LaunchParam) -> bool;

    fn execute(&self, provider: &dyn LaunchProvider) -> Result<LaunchReport>;

    /// The declared capability set, in catalog order.
    fn supported_params(&self) -> Vec<LaunchParam> {
        LaunchParam::ALL
            .into_iter()
            .filter(|&param| self.supports(param))
            .collect()
    }

    /// Check whether this strategy can honor everything `provider` supplies.
    fn covers(&self, provider: &dyn LaunchProvider) -> bool {
        LaunchParam::ALL
            .into_iter()
            .all(|param| !provider.provides(param) || self.supports(param))
    }
}
