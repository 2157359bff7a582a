//! Platform strategy registration.

use std::sync::Arc;

use tracing::info;

use proclaunch_core::{LaunchStrategy, StrategyDispatcher};

use crate::std_command::StdCommandStrategy;

/// Build the dispatcher with this platform's strategy set.
///
/// The portable strategy is registered first so that plain launches take
/// the plain path; knob-rich requests fall through to the native strategy
/// where the platform has one.
pub fn platform_dispatcher() -> StrategyDispatcher {
    let mut strategies: Vec<Arc<dyn LaunchStrategy>> = Vec::new();
    strategies.push(Arc::new(StdCommandStrategy::new()));

    #[cfg(windows)]
    {
        use proclaunch_core::{NativeUserProcessStrategy, ProcessApiFactory};

        let api = proclaunch_windows::WindowsProcessApiFactory::create_api();
        strategies.push(Arc::new(NativeUserProcessStrategy::new(api)));
    }

    info!(
        platform = platform_name(),
        strategies = strategies.len(),
        "registered launch strategies"
    );
    StrategyDispatcher::new(strategies)
}

pub fn platform_name() -> &'static str {
    #[cfg(windows)]
    return "windows";

    #[cfg(not(windows))]
    return "portable";
}
