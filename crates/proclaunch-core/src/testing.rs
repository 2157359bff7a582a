//! Test double for the native process boundary.
//!
//! [`FakeProcessApi`] keeps a ledger of every allocation the launch
//! sequence makes so tests can assert the cleanup invariant: everything
//! acquired during `execute` is released exactly once, on every exit path.
//! Releases of unknown or already-released handles are recorded as
//! violations instead of panicking, so a test can report all of them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::native::{
    BlockSpec, NtStatus, ParamBlockHandle, PathHandle, ProcessApi, ProcessHandles, TokenHandle,
    status,
};

/// One process created through the fake boundary.
#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub process_id: u32,
    pub image_path: String,
    pub command_line: String,
    pub working_directory: Option<String>,
    pub desktop: Option<String>,
    pub token: Option<TokenHandle>,
    pub inherit_handles: bool,
    pub suspended: bool,
    pub resume_count: u32,
}

#[derive(Debug, Clone)]
struct FakeBlock {
    command_line: String,
    working_directory: Option<String>,
    desktop: Option<String>,
}

#[derive(Default)]
struct FakeState {
    last_error: u32,
    next_id: u64,
    live_paths: BTreeMap<u64, String>,
    live_blocks: BTreeMap<u64, FakeBlock>,
    blocks_built: u64,
    open_processes: BTreeSet<u32>,
    processes: BTreeMap<u32, FakeProcess>,
    native_calls: u64,
    violations: Vec<String>,
    fail_normalize: Option<NtStatus>,
    fail_block: Option<NtStatus>,
    fail_create: Option<NtStatus>,
    fail_resume: Option<NtStatus>,
}

impl FakeState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory [`ProcessApi`] with failure injection and a release ledger.
#[derive(Default)]
pub struct FakeProcessApi {
    state: Mutex<FakeState>,
}

impl FakeProcessApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn set_last_error(&self, code: u32) {
        self.state().last_error = code;
    }

    pub fn fail_normalize_with(&self, status: NtStatus) {
        self.state().fail_normalize = Some(status);
    }

    pub fn fail_parameter_block_with(&self, status: NtStatus) {
        self.state().fail_block = Some(status);
    }

    pub fn fail_create_with(&self, status: NtStatus) {
        self.state().fail_create = Some(status);
    }

    pub fn fail_resume_with(&self, status: NtStatus) {
        self.state().fail_resume = Some(status);
    }

    /// Path buffers and parameter blocks not yet released.
    pub fn outstanding_allocations(&self) -> usize {
        let state = self.state();
        state.live_paths.len() + state.live_blocks.len()
    }

    /// Process/thread handle pairs not yet closed.
    pub fn open_process_handles(&self) -> usize {
        self.state().open_processes.len()
    }

    /// Total native calls observed, releases included.
    pub fn native_call_count(&self) -> u64 {
        self.state().native_calls
    }

    /// Parameter blocks ever built, destroyed or not.
    pub fn parameter_blocks_built(&self) -> u64 {
        self.state().blocks_built
    }

    /// Double releases and other ledger breaches observed so far.
    pub fn violations(&self) -> Vec<String> {
        self.state().violations.clone()
    }

    pub fn process(&self, process_id: u32) -> Option<FakeProcess> {
        self.state().processes.get(&process_id).cloned()
    }

    pub fn created_processes(&self) -> Vec<FakeProcess> {
        self.state().processes.values().cloned().collect()
    }
}

impl ProcessApi for FakeProcessApi {
    fn last_error(&self) -> u32 {
        self.state().last_error
    }

    fn normalize_path(&self, dos_path: &str) -> (NtStatus, PathHandle) {
        let mut state = self.state();
        state.native_calls += 1;
        if let Some(failure) = state.fail_normalize {
            return (failure, PathHandle::default());
        }
        let id = state.allocate_id();
        state.live_paths.insert(id, format!(r"\??\{dos_path}"));
        (status::SUCCESS, PathHandle(id))
    }

    fn release_path(&self, path: PathHandle) {
        let mut state = self.state();
        state.native_calls += 1;
        if state.live_paths.remove(&path.0).is_none() {
            state
                .violations
                .push(format!("path buffer {path:?} released while not live"));
        }
    }

    fn create_parameter_block(&self, spec: &BlockSpec<'_>) -> (NtStatus, ParamBlockHandle) {
        let mut state = self.state();
        state.native_calls += 1;
        if let Some(failure) = state.fail_block {
            return (failure, ParamBlockHandle::default());
        }
        if !state.live_paths.contains_key(&spec.image_path.0) {
            state.violations.push(format!(
                "parameter block built from non-live path {:?}",
                spec.image_path
            ));
        }
        let id = state.allocate_id();
        state.live_blocks.insert(
            id,
            FakeBlock {
                command_line: spec.command_line.to_string(),
                working_directory: spec.working_directory.map(str::to_string),
                desktop: spec.desktop.map(str::to_string),
            },
        );
        state.blocks_built += 1;
        (status::SUCCESS, ParamBlockHandle(id))
    }

    fn destroy_parameter_block(&self, block: ParamBlockHandle) {
        let mut state = self.state();
        state.native_calls += 1;
        if state.live_blocks.remove(&block.0).is_none() {
            state
                .violations
                .push(format!("parameter block {block:?} destroyed while not live"));
        }
    }

    fn create_user_process(
        &self,
        image: PathHandle,
        block: ParamBlockHandle,
        token: Option<TokenHandle>,
        inherit_handles: bool,
    ) -> (NtStatus, ProcessHandles) {
        let mut state = self.state();
        state.native_calls += 1;
        if let Some(failure) = state.fail_create {
            return (failure, ProcessHandles::default());
        }
        let image_path = match state.live_paths.get(&image.0) {
            Some(path) => path.clone(),
            None => {
                state
                    .violations
                    .push(format!("process created from non-live path {image:?}"));
                String::new()
            }
        };
        let block = match state.live_blocks.get(&block.0) {
            Some(block) => block.clone(),
            None => {
                state
                    .violations
                    .push(format!("process created from non-live block {block:?}"));
                FakeBlock {
                    command_line: String::new(),
                    working_directory: None,
                    desktop: None,
                }
            }
        };
        let process_id = 1000 + state.allocate_id() as u32;
        state.processes.insert(
            process_id,
            FakeProcess {
                process_id,
                image_path,
                command_line: block.command_line,
                working_directory: block.working_directory,
                desktop: block.desktop,
                token,
                inherit_handles,
                suspended: true,
                resume_count: 0,
            },
        );
        state.open_processes.insert(process_id);
        (
            status::SUCCESS,
            ProcessHandles {
                process: process_id as isize,
                thread: process_id as isize,
                process_id,
            },
        )
    }

    fn resume_initial_thread(&self, handles: &ProcessHandles) -> NtStatus {
        let mut state = self.state();
        state.native_calls += 1;
        if let Some(failure) = state.fail_resume {
            return failure;
        }
        match state.processes.get_mut(&handles.process_id) {
            Some(process) => {
                process.suspended = false;
                process.resume_count += 1;
                status::SUCCESS
            }
            None => status::INVALID_PARAMETER,
        }
    }

    fn close_process_handles(&self, handles: ProcessHandles) {
        let mut state = self.state();
        state.native_calls += 1;
        if !state.open_processes.remove(&handles.process_id) {
            state.violations.push(format!(
                "process handles for pid {} closed while not open",
                handles.process_id
            ));
        }
    }
}
