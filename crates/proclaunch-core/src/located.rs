//! Located errors: a numeric status bound to the exact operation that
//! produced it.
//!
//! Consumers recognize specific failure causes by matching on the exact
//! `(origin, code)` pair, so origin strings are stable, unique per failing
//! call site, and never reused across semantically different operations.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Weak};

use thiserror::Error;

use crate::native::{NtStatus, nt_success, status, win32};

/// Stable origin names for the native launch sequence.
///
/// These strings are a contract with error-presentation consumers and must
/// never change or be reused for different operations.
pub mod origins {
    pub const DOS_PATH_TO_NT_PATH: &str = "RtlDosPathNameToNtPathName_U";
    pub const CREATE_PROCESS_PARAMETERS: &str = "RtlCreateProcessParametersEx";
    pub const CREATE_USER_PROCESS: &str = "RtlCreateUserProcess";
    pub const RESUME_THREAD: &str = "NtResumeThread";

    /// Origin for property get/set collaborators: `"<Verb>Information [<InfoClass>]"`.
    ///
    /// Presentation consumers key remediation hints on this exact shape.
    pub fn information(verb: &str, info_class: &str) -> String {
        format!("{verb}Information [{info_class}]")
    }
}

/// Back-reference target for the object that attempted a failing operation.
pub trait ErrorContext: Send + Sync {
    fn context_name(&self) -> &str;
}

/// Weak back-reference to an [`ErrorContext`]; never owned by the error.
pub type ContextRef = Weak<dyn ErrorContext>;

/// The two native error-numbering spaces a code can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    Win32,
    Nt,
}

impl ErrorDomain {
    /// Classify a code by the NT success predicate: codes that would count
    /// as NT "success" cannot be NTSTATUS failures, so they are read as
    /// Win32 errors; the rest are read as NTSTATUS values.
    ///
    /// This is a documented, lossy heuristic. Codes that are valid in both
    /// numbering spaces are possible; a future revision should carry an
    /// explicit domain tag instead of inferring one.
    pub const fn classify(code: u32) -> ErrorDomain {
        if nt_success(code as NtStatus) {
            ErrorDomain::Win32
        } else {
            ErrorDomain::Nt
        }
    }
}

/// Render the canonical message for an `(origin, code)` pair.
///
/// Pure function of its inputs: equal inputs always render equal messages.
pub fn format_error_message(origin: &str, code: u32) -> String {
    match ErrorDomain::classify(code) {
        ErrorDomain::Win32 => format!(
            "{origin} failed with Win32 error 0x{code:08X}: {}",
            describe_win32(code)
        ),
        ErrorDomain::Nt => format!(
            "{origin} failed with NTSTATUS 0x{code:08X}: {}",
            describe_status(code as NtStatus)
        ),
    }
}

fn describe_win32(code: u32) -> &'static str {
    match code {
        win32::ERROR_SUCCESS => "the operation completed successfully",
        win32::ERROR_FILE_NOT_FOUND => "the system cannot find the file specified",
        win32::ERROR_PATH_NOT_FOUND => "the system cannot find the path specified",
        win32::ERROR_ACCESS_DENIED => "access is denied",
        win32::ERROR_INVALID_HANDLE => "the handle is invalid",
        win32::ERROR_NOT_ENOUGH_MEMORY => "not enough memory is available",
        win32::ERROR_INVALID_PARAMETER => "the parameter is incorrect",
        win32::ERROR_INSUFFICIENT_BUFFER => "the data area passed to a system call is too small",
        win32::ERROR_MORE_DATA => "more data is available",
        win32::ERROR_IMPLEMENTATION_LIMIT => "an implementation limit was reached",
        win32::ERROR_PRIVILEGE_NOT_HELD => "a required privilege is not held by the client",
        win32::ERROR_INTERNAL_ERROR => "an internal error occurred",
        _ => "unrecognized error code",
    }
}

fn describe_status(code: NtStatus) -> &'static str {
    match code {
        status::UNSUCCESSFUL => "the requested operation was unsuccessful",
        status::NOT_IMPLEMENTED => "the requested operation is not implemented",
        status::INVALID_PARAMETER => "an invalid parameter was passed to a service or function",
        status::NO_MEMORY => "not enough virtual memory or paging file quota is available",
        status::ACCESS_DENIED => "a process has requested access to an object but has not been granted those access rights",
        status::BUFFER_TOO_SMALL => "the buffer is too small to contain the entry",
        status::OBJECT_NAME_INVALID => "the object name is invalid",
        status::OBJECT_NAME_NOT_FOUND => "the object name is not found",
        status::OBJECT_PATH_NOT_FOUND => "the object path component was not found",
        status::PRIVILEGE_NOT_HELD => "a required privilege is not held by the client",
        _ => "unrecognized status code",
    }
}

/// An error value that binds a numeric status to the exact operation name
/// that produced it.
///
/// The human-readable message is rendered eagerly at construction so that
/// formatting never depends on later state.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LocatedError {
    code: u32,
    origin: Cow<'static, str>,
    context: Option<ContextRef>,
    message: String,
}

impl LocatedError {
    pub fn new(code: u32, origin: impl Into<Cow<'static, str>>) -> Self {
        let origin = origin.into();
        let message = format_error_message(&origin, code);
        Self {
            code,
            origin,
            context: None,
            message,
        }
    }

    pub fn with_context(
        code: u32,
        origin: impl Into<Cow<'static, str>>,
        context: ContextRef,
    ) -> Self {
        let mut error = Self::new(code, origin);
        error.context = Some(context);
        error
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn domain(&self) -> ErrorDomain {
        ErrorDomain::classify(self.code)
    }

    /// The lookup contract used by upstream consumers to recognize a
    /// specific, known failure cause.
    pub fn error_is(&self, origin: &str, code: u32) -> bool {
        self.origin == origin && self.code == code
    }

    /// The object that attempted the operation, if it is still alive.
    pub fn context(&self) -> Option<Arc<dyn ErrorContext>> {
        self.context.as_ref().and_then(Weak::upgrade)
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Win32 => write!(f, "Win32"),
            ErrorDomain::Nt => write!(f, "NTSTATUS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_success_predicate() {
        assert_eq!(ErrorDomain::classify(win32::ERROR_ACCESS_DENIED), ErrorDomain::Win32);
        assert_eq!(ErrorDomain::classify(win32::ERROR_FILE_NOT_FOUND), ErrorDomain::Win32);
        assert_eq!(
            ErrorDomain::classify(status::OBJECT_NAME_NOT_FOUND as u32),
            ErrorDomain::Nt
        );
        assert_eq!(ErrorDomain::classify(status::ACCESS_DENIED as u32), ErrorDomain::Nt);
    }

    #[test]
    fn formatting_is_deterministic() {
        let a = format_error_message(origins::CREATE_USER_PROCESS, status::ACCESS_DENIED as u32);
        let b = format_error_message(origins::CREATE_USER_PROCESS, status::ACCESS_DENIED as u32);
        assert_eq!(a, b);
        assert!(a.contains("RtlCreateUserProcess"));
        assert!(a.contains("0xC0000022"));
        assert!(a.contains("NTSTATUS"));
    }

    #[test]
    fn win32_codes_format_as_win32() {
        let message = format_error_message("OpenProcess", win32::ERROR_ACCESS_DENIED);
        assert!(message.contains("Win32 error 0x00000005"));
        assert!(message.contains("access is denied"));
    }

    #[test]
    fn error_is_matches_exact_origin_and_code() {
        let error = LocatedError::new(
            status::OBJECT_NAME_NOT_FOUND as u32,
            origins::DOS_PATH_TO_NT_PATH,
        );
        assert!(error.error_is(origins::DOS_PATH_TO_NT_PATH, status::OBJECT_NAME_NOT_FOUND as u32));
        assert!(!error.error_is(origins::DOS_PATH_TO_NT_PATH, status::ACCESS_DENIED as u32));
        assert!(!error.error_is(origins::CREATE_USER_PROCESS, status::OBJECT_NAME_NOT_FOUND as u32));
    }

    #[test]
    fn information_origin_shape_is_stable() {
        assert_eq!(
            origins::information("Get", "TokenElevation"),
            "GetInformation [TokenElevation]"
        );
        assert_eq!(
            origins::information("Set", "ProcessAccessToken"),
            "SetInformation [ProcessAccessToken]"
        );
    }

    #[test]
    fn context_is_a_weak_reference() {
        struct Origin;
        impl ErrorContext for Origin {
            fn context_name(&self) -> &str {
                "origin"
            }
        }

        let holder: Arc<dyn ErrorContext> = Arc::new(Origin);
        let error = LocatedError::with_context(
            win32::ERROR_ACCESS_DENIED,
            "OpenProcess",
            Arc::downgrade(&holder),
        );
        assert_eq!(error.context().expect("context alive").context_name(), "origin");

        drop(holder);
        assert!(error.context().is_none(), "the error must not keep the context alive");
    }
}
