//! Boundary between the launch strategies and the operating system.
//!
//! Every native call a strategy performs goes through the [`ProcessApi`]
//! trait: path normalization, process-parameter-block construction, the
//! creation primitive itself, and the release calls that balance them.
//! Platform crates implement the trait against the real OS; tests implement
//! it against an in-memory ledger.

use std::sync::Arc;

/// NT status code. Negative values (severity bit set) are failures.
pub type NtStatus = i32;

/// The NT success predicate: success, informational, and warning severities
/// all count as success; only error severity fails.
pub const fn nt_success(status: NtStatus) -> bool {
    status >= 0
}

/// Win32 error codes recognized by the launch core.
pub mod win32 {
    pub const ERROR_SUCCESS: u32 = 0;
    pub const ERROR_FILE_NOT_FOUND: u32 = 2;
    pub const ERROR_PATH_NOT_FOUND: u32 = 3;
    pub const ERROR_ACCESS_DENIED: u32 = 5;
    pub const ERROR_INVALID_HANDLE: u32 = 6;
    pub const ERROR_NOT_ENOUGH_MEMORY: u32 = 8;
    pub const ERROR_INVALID_PARAMETER: u32 = 87;
    pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;
    pub const ERROR_MORE_DATA: u32 = 234;
    pub const ERROR_IMPLEMENTATION_LIMIT: u32 = 1292;
    pub const ERROR_PRIVILEGE_NOT_HELD: u32 = 1314;
    pub const ERROR_INTERNAL_ERROR: u32 = 1359;
}

/// NTSTATUS values recognized by the launch core.
pub mod status {
    use super::NtStatus;

    pub const SUCCESS: NtStatus = 0;
    pub const UNSUCCESSFUL: NtStatus = 0xC000_0001_u32 as NtStatus;
    pub const NOT_IMPLEMENTED: NtStatus = 0xC000_0002_u32 as NtStatus;
    pub const INVALID_PARAMETER: NtStatus = 0xC000_000D_u32 as NtStatus;
    pub const NO_MEMORY: NtStatus = 0xC000_0017_u32 as NtStatus;
    pub const ACCESS_DENIED: NtStatus = 0xC000_0022_u32 as NtStatus;
    pub const BUFFER_TOO_SMALL: NtStatus = 0xC000_0023_u32 as NtStatus;
    pub const OBJECT_NAME_INVALID: NtStatus = 0xC000_0033_u32 as NtStatus;
    pub const OBJECT_NAME_NOT_FOUND: NtStatus = 0xC000_0034_u32 as NtStatus;
    pub const OBJECT_PATH_NOT_FOUND: NtStatus = 0xC000_003A_u32 as NtStatus;
    pub const PRIVILEGE_NOT_HELD: NtStatus = 0xC000_0061_u32 as NtStatus;
}

/// Opaque handle to a normalized (NT-form) path buffer.
///
/// Owned by whoever received it from [`ProcessApi::normalize_path`]; must be
/// returned through [`ProcessApi::release_path`] exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PathHandle(pub u64);

impl PathHandle {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Opaque handle to a native process-parameter block.
///
/// Must be returned through [`ProcessApi::destroy_parameter_block`] exactly
/// once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParamBlockHandle(pub u64);

impl ParamBlockHandle {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// A raw security-token handle supplied by the caller.
///
/// The launch core never opens or closes tokens; it only forwards them to
/// the creation primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenHandle(pub isize);

/// Process and initial-thread handles returned by the creation primitive.
///
/// Ownership ends inside the strategy that received them; they are closed
/// through [`ProcessApi::close_process_handles`] before `execute` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHandles {
    pub process: isize,
    pub thread: isize,
    pub process_id: u32,
}

/// Inputs to process-parameter-block construction.
///
/// Optional fields that the provider did not supply are passed as absent,
/// never defaulted.
#[derive(Debug)]
pub struct BlockSpec<'a> {
    pub image_path: PathHandle,
    pub command_line: &'a str,
    pub working_directory: Option<&'a str>,
    pub desktop: Option<&'a str>,
}

/// The native process-creation boundary.
///
/// Calls return `(NtStatus, value)` pairs in the out-parameter convention:
/// the value is meaningful only when the status satisfies [`nt_success`].
/// The creation primitive always creates the process suspended; resuming is
/// a separate call so callers keep the initial-suspend checkpoint.
pub trait ProcessApi: Send + Sync {
    /// Last Win32 error code recorded by the platform for this thread.
    fn last_error(&self) -> u32;

    /// Convert a caller-supplied path into the platform's native form.
    fn normalize_path(&self, dos_path: &str) -> (NtStatus, PathHandle);

    /// Release a buffer obtained from [`normalize_path`](Self::normalize_path).
    fn release_path(&self, path: PathHandle);

    /// Build a process-parameter block from the given buffers.
    fn create_parameter_block(&self, spec: &BlockSpec<'_>) -> (NtStatus, ParamBlockHandle);

    /// Destroy a block obtained from
    /// [`create_parameter_block`](Self::create_parameter_block).
    fn destroy_parameter_block(&self, block: ParamBlockHandle);

    /// Create a process from the normalized image path and parameter block.
    /// The process is left suspended.
    fn create_user_process(
        &self,
        image: PathHandle,
        block: ParamBlockHandle,
        token: Option<TokenHandle>,
        inherit_handles: bool,
    ) -> (NtStatus, ProcessHandles);

    /// Resume the initial thread of a process created suspended.
    fn resume_initial_thread(&self, handles: &ProcessHandles) -> NtStatus;

    /// Close both handles returned by the creation primitive.
    fn close_process_handles(&self, handles: ProcessHandles);
}

/// Platform factory for the native boundary, implemented by platform crates.
pub trait ProcessApiFactory {
    fn create_api() -> Arc<dyn ProcessApi>;

    fn platform_name() -> &'static str;
}
