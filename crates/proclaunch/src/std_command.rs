//! Portable launch strategy built on `std::process::Command`.

use std::process::Command;

use tracing::info;

use proclaunch_core::{
    LaunchError, LaunchParam, LaunchProvider, LaunchReport, LaunchStrategy, Result,
};

/// Spawns through the standard library.
///
/// Covers the plain subset of the catalog: no desktop assignment, no token,
/// no suspended creation. The spawned process is always left running, and
/// the child handle is dropped here; lifetime management past launch is out
/// of scope.
#[derive(Default)]
pub struct StdCommandStrategy;

impl StdCommandStrategy {
    pub const NAME: &'static str = "std-command";

    pub fn new() -> Self {
        Self
    }
}

impl LaunchStrategy for StdCommandStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports(&self, param: LaunchParam) -> bool {
        matches!(
            param,
            LaunchParam::ApplicationPath | LaunchParam::CommandLine | LaunchParam::WorkingDirectory
        )
    }

    fn execute(&self, provider: &dyn LaunchProvider) -> Result<LaunchReport> {
        let application_path = provider
            .application_path()
            .ok_or(LaunchError::MissingApplicationPath)?;

        let mut command = Command::new(application_path);
        if let Some(line) = provider.command_line() {
            // Whitespace split; quoting-aware parsing is the native
            // strategy's territory.
            command.args(line.split_whitespace());
        }
        if let Some(directory) = provider.working_directory() {
            command.current_dir(directory);
        }

        let child = command.spawn()?;
        let process_id = child.id();
        info!(
            process_id,
            command = application_path,
            strategy = Self::NAME,
            "spawned process"
        );
        Ok(LaunchReport {
            process_id,
            left_suspended: false,
        })
    }
}
