//! The reference native creation strategy.
//!
//! Drives the full native sequence: normalize the image path, compose the
//! command line, build the process-parameter block, create the process
//! suspended, then resume unless the caller asked otherwise. Every
//! intermediate native allocation is owned by a scope guard so it is
//! released exactly once on every exit path.

use std::sync::{Arc, Weak};

use tracing::info;

use crate::cmdline::compose_command_line;
use crate::error::{LaunchError, Result};
use crate::located::{ContextRef, ErrorContext, origins};
use crate::native::{BlockSpec, ParamBlockHandle, PathHandle, ProcessApi, ProcessHandles};
use crate::op_result::OpResult;
use crate::params::{LaunchParam, LaunchProvider};
use crate::strategy::{LaunchReport, LaunchStrategy};

struct StrategyContext {
    name: &'static str,
}

impl ErrorContext for StrategyContext {
    fn context_name(&self) -> &str {
        self.name
    }
}

struct PathGuard<'a> {
    api: &'a dyn ProcessApi,
    path: PathHandle,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.api.release_path(self.path);
    }
}

struct BlockGuard<'a> {
    api: &'a dyn ProcessApi,
    block: ParamBlockHandle,
}

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        self.api.destroy_parameter_block(self.block);
    }
}

struct HandlesGuard<'a> {
    api: &'a dyn ProcessApi,
    handles: ProcessHandles,
}

impl Drop for HandlesGuard<'_> {
    fn drop(&mut self) {
        self.api.close_process_handles(self.handles);
    }
}

/// Creates processes through the native user-process primitive.
///
/// Honors the entire parameter catalog, including security tokens and
/// desktop assignment.
pub struct NativeUserProcessStrategy {
    api: Arc<dyn ProcessApi>,
    context: Arc<StrategyContext>,
}

impl NativeUserProcessStrategy {
    pub const NAME: &'static str = "native-user-process";

    pub fn new(api: Arc<dyn ProcessApi>) -> Self {
        Self {
            api,
            context: Arc::new(StrategyContext { name: Self::NAME }),
        }
    }

    fn context_ref(&self) -> ContextRef {
        let weak: Weak<StrategyContext> = Arc::downgrade(&self.context);
        weak
    }
}

impl LaunchStrategy for NativeUserProcessStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports(&self, param: LaunchParam) -> bool {
        match param {
            LaunchParam::ApplicationPath
            | LaunchParam::CommandLine
            | LaunchParam::WorkingDirectory
            | LaunchParam::Desktop
            | LaunchParam::InheritHandles
            | LaunchParam::CreateSuspended
            | LaunchParam::Token => true,
        }
    }

    fn execute(&self, provider: &dyn LaunchProvider) -> Result<LaunchReport> {
        let application_path = provider
            .application_path()
            .ok_or(LaunchError::MissingApplicationPath)?;
        let api = self.api.as_ref();

        // Image path into NT form. Fatal to the attempt if it fails.
        let mut path_slot = OpResult::with_context(self.context_ref());
        let (status, nt_path) = api.normalize_path(application_path);
        if path_slot.check_native(status, origins::DOS_PATH_TO_NT_PATH) {
            path_slot.accept(nt_path);
        }
        let nt_path = path_slot.into_value()?;
        let _path_guard = PathGuard { api, path: nt_path };

        let command_line = compose_command_line(application_path, provider.command_line());

        // Optional buffers pass through as absent, never defaulted.
        let spec = BlockSpec {
            image_path: nt_path,
            command_line: &command_line,
            working_directory: provider.working_directory(),
            desktop: provider.desktop(),
        };
        let mut block_slot = OpResult::with_context(self.context_ref());
        let (status, block) = api.create_parameter_block(&spec);
        if block_slot.check_native(status, origins::CREATE_PROCESS_PARAMETERS) {
            block_slot.accept(block);
        }
        let block = block_slot.into_value()?;
        let _block_guard = BlockGuard { api, block };

        let inherit_handles = provider.inherit_handles().unwrap_or(false);
        let mut process_slot = OpResult::with_context(self.context_ref());
        let (status, handles) =
            api.create_user_process(nt_path, block, provider.token(), inherit_handles);
        if process_slot.check_native(status, origins::CREATE_USER_PROCESS) {
            process_slot.accept(handles);
        }
        let handles = process_slot.into_value()?;
        // Raw handle ownership ends in this scope, success or not.
        let _handles_guard = HandlesGuard { api, handles };

        let leave_suspended = provider.create_suspended().unwrap_or(false);
        if !leave_suspended {
            let mut resume_slot = OpResult::with_context(self.context_ref());
            let status = api.resume_initial_thread(&handles);
            if resume_slot.check_native(status, origins::RESUME_THREAD) {
                resume_slot.accept(());
            }
            resume_slot.into_value()?;
        }

        info!(
            process_id = handles.process_id,
            suspended = leave_suspended,
            strategy = Self::NAME,
            "created native process"
        );
        Ok(LaunchReport {
            process_id: handles.process_id,
            left_suspended: leave_suspended,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::status;
    use crate::params::LaunchRequest;
    use crate::testing::FakeProcessApi;

    fn strategy() -> (Arc<FakeProcessApi>, NativeUserProcessStrategy) {
        let api = Arc::new(FakeProcessApi::new());
        let strategy = NativeUserProcessStrategy::new(api.clone());
        (api, strategy)
    }

    fn request() -> LaunchRequest {
        LaunchRequest::builder()
            .application_path(r"C:\Windows\System32\cmd.exe")
            .command_line("/c whoami")
            .build()
            .unwrap()
    }

    #[test]
    fn successful_launch_resumes_and_releases_everything() {
        let (api, strategy) = strategy();
        let report = strategy.execute(&request()).expect("launch succeeds");

        let process = api.process(report.process_id).expect("process created");
        assert!(!process.suspended);
        assert_eq!(process.resume_count, 1);
        assert_eq!(process.command_line, r"C:\Windows\System32\cmd.exe /c whoami");
        assert!(!report.left_suspended);

        assert_eq!(api.outstanding_allocations(), 0);
        assert_eq!(api.open_process_handles(), 0);
        assert!(api.violations().is_empty(), "{:?}", api.violations());
    }

    #[test]
    fn suspended_launch_never_resumes() {
        let (api, strategy) = strategy();
        let mut request = request();
        request.create_suspended = Some(true);

        let report = strategy.execute(&request).expect("launch succeeds");
        let process = api.process(report.process_id).expect("process created");
        assert!(process.suspended);
        assert_eq!(process.resume_count, 0);
        assert!(report.left_suspended);
        assert_eq!(api.outstanding_allocations(), 0);
        assert!(api.violations().is_empty());
    }

    #[test]
    fn create_suspended_false_still_resumes() {
        let (api, strategy) = strategy();
        let mut request = request();
        request.create_suspended = Some(false);

        let report = strategy.execute(&request).expect("launch succeeds");
        assert!(!report.left_suspended);
        let process = api.process(report.process_id).expect("process created");
        assert_eq!(process.resume_count, 1);
    }

    #[test]
    fn optional_buffers_are_forwarded_only_when_provided() {
        let (api, strategy) = strategy();
        let mut request = request();
        request.working_directory = Some(r"C:\Windows".to_string());

        let report = strategy.execute(&request).expect("launch succeeds");
        let process = api.process(report.process_id).expect("process created");
        assert_eq!(process.working_directory.as_deref(), Some(r"C:\Windows"));
        assert_eq!(process.desktop, None);
    }

    #[test]
    fn token_and_inherit_flag_reach_the_primitive() {
        let (api, strategy) = strategy();
        let mut request = request();
        request.token = Some(crate::native::TokenHandle(0x5C));
        request.inherit_handles = Some(true);

        let report = strategy.execute(&request).expect("launch succeeds");
        let process = api.process(report.process_id).expect("process created");
        assert_eq!(process.token, Some(crate::native::TokenHandle(0x5C)));
        assert!(process.inherit_handles);
    }

    #[test]
    fn normalization_failure_is_located_and_leaves_nothing_behind() {
        let (api, strategy) = strategy();
        api.fail_normalize_with(status::OBJECT_NAME_NOT_FOUND);

        let error = strategy.execute(&request()).expect_err("launch fails");
        let located = error.located().expect("native failure");
        assert!(located.error_is(
            origins::DOS_PATH_TO_NT_PATH,
            status::OBJECT_NAME_NOT_FOUND as u32
        ));
        assert_eq!(located.context().expect("context alive").context_name(), "native-user-process");

        assert_eq!(api.parameter_blocks_built(), 0);
        assert_eq!(api.outstanding_allocations(), 0);
        assert_eq!(api.open_process_handles(), 0);
        assert!(api.violations().is_empty());
    }

    #[test]
    fn block_failure_releases_the_normalized_path() {
        let (api, strategy) = strategy();
        api.fail_parameter_block_with(status::NO_MEMORY);

        let error = strategy.execute(&request()).expect_err("launch fails");
        let located = error.located().expect("native failure");
        assert!(located.error_is(origins::CREATE_PROCESS_PARAMETERS, status::NO_MEMORY as u32));
        assert_eq!(api.outstanding_allocations(), 0);
        assert!(api.violations().is_empty());
    }

    #[test]
    fn create_failure_releases_block_and_path() {
        let (api, strategy) = strategy();
        api.fail_create_with(status::ACCESS_DENIED);

        let error = strategy.execute(&request()).expect_err("launch fails");
        let located = error.located().expect("native failure");
        assert!(located.error_is(origins::CREATE_USER_PROCESS, status::ACCESS_DENIED as u32));
        assert_eq!(api.outstanding_allocations(), 0);
        assert_eq!(api.open_process_handles(), 0);
        assert!(api.violations().is_empty());
    }

    #[test]
    fn resume_failure_still_closes_handles() {
        let (api, strategy) = strategy();
        api.fail_resume_with(status::ACCESS_DENIED);

        let error = strategy.execute(&request()).expect_err("launch fails");
        let located = error.located().expect("native failure");
        assert!(located.error_is(origins::RESUME_THREAD, status::ACCESS_DENIED as u32));
        assert_eq!(api.outstanding_allocations(), 0);
        assert_eq!(api.open_process_handles(), 0);
        assert!(api.violations().is_empty());
    }

    #[test]
    fn missing_application_path_fails_before_any_native_call() {
        let (api, strategy) = strategy();
        let error = strategy
            .execute(&LaunchRequest::default())
            .expect_err("launch fails");
        assert!(matches!(error, LaunchError::MissingApplicationPath));
        assert_eq!(api.native_call_count(), 0);
    }

    #[test]
    fn supports_the_whole_catalog() {
        let (_, strategy) = strategy();
        assert_eq!(strategy.supported_params(), LaunchParam::ALL.to_vec());
    }

    #[test]
    fn dispatched_launch_ends_with_a_running_process() {
        use crate::dispatch::StrategyDispatcher;

        let (api, strategy) = strategy();
        let dispatcher = StrategyDispatcher::new(vec![Arc::new(strategy)]);

        let report = dispatcher.launch(&request()).expect("launch succeeds");
        let process = api.process(report.process_id).expect("process created");
        assert!(!process.suspended, "no CreateSuspended knob, so the process must be running");
        assert!(!report.left_suspended);
    }

    /// A strategy that declines the token knob, for negotiation tests.
    struct TokenlessNative {
        inner: NativeUserProcessStrategy,
    }

    impl LaunchStrategy for TokenlessNative {
        fn name(&self) -> &'static str {
            "tokenless-native"
        }

        fn supports(&self, param: LaunchParam) -> bool {
            param != LaunchParam::Token && self.inner.supports(param)
        }

        fn execute(&self, provider: &dyn LaunchProvider) -> Result<LaunchReport> {
            self.inner.execute(provider)
        }
    }

    #[test]
    fn negotiation_failure_happens_before_any_native_call() {
        use crate::dispatch::StrategyDispatcher;

        let (api, strategy) = strategy();
        let dispatcher = StrategyDispatcher::new(vec![Arc::new(TokenlessNative { inner: strategy })]);

        let mut request = request();
        request.token = Some(crate::native::TokenHandle(9));
        let error = dispatcher.launch(&request).expect_err("negotiation fails");
        assert!(matches!(error, LaunchError::UnsupportedParameterSet { .. }));
        assert_eq!(api.native_call_count(), 0, "nothing native may run before negotiation");
    }
}
