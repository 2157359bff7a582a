//! Fallible-result wrapper for native call sequences.
//!
//! Native calls report failure three different ways: a boolean return with
//! the detail in the thread's last error, an NTSTATUS, or a probe-then-fill
//! buffer protocol. [`OpResult`] funnels all three into one shape and
//! bridges into `?`-style propagation through [`OpResult::into_value`].

use std::borrow::Cow;

use crate::located::{ContextRef, LocatedError};
use crate::native::{NtStatus, ProcessApi, nt_success, win32};

/// Hard ceiling for probe-then-fill buffer sizes: 256 MiB.
///
/// A probe that asks for more than this is reported as an implementation
/// limit rather than trusting the oversized value.
pub const MAX_BUFFER_SIZE: u32 = 268_435_456;

/// Container holding either a value or a captured failure.
///
/// Starts invalid; only [`accept`](Self::accept) or
/// [`success`](Self::success) make it valid. The check methods capture the
/// failing code and origin but leave the wrapper invalid, so a sequence of
/// checks can be written straight-line and resolved once at the end.
#[derive(Debug)]
pub struct OpResult<T> {
    value: Option<T>,
    code: u32,
    origin: Option<Cow<'static, str>>,
    context: Option<ContextRef>,
}

impl<T> OpResult<T> {
    /// A fresh wrapper in the invalid state with no captured failure.
    pub fn invalid() -> Self {
        Self {
            value: None,
            code: win32::ERROR_SUCCESS,
            origin: None,
            context: None,
        }
    }

    /// Like [`invalid`](Self::invalid), with a weak back-reference to the
    /// object attempting the operation.
    pub fn with_context(context: ContextRef) -> Self {
        let mut result = Self::invalid();
        result.context = Some(context);
        result
    }

    /// A valid wrapper holding `value`.
    pub fn success(value: T) -> Self {
        let mut result = Self::invalid();
        result.value = Some(value);
        result
    }

    /// Mark the wrapper valid and store `value`, clearing any captured
    /// failure.
    pub fn accept(&mut self, value: T) {
        self.value = Some(value);
        self.code = win32::ERROR_SUCCESS;
        self.origin = None;
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    /// Accept a boolean-convention native result. On failure, captures the
    /// platform's last error code and `origin`. Returns `ok` unchanged.
    pub fn check_error(
        &mut self,
        api: &dyn ProcessApi,
        ok: bool,
        origin: impl Into<Cow<'static, str>>,
    ) -> bool {
        if !ok {
            self.capture(api.last_error(), origin.into());
        }
        ok
    }

    /// Accept an NTSTATUS-convention native result.
    pub fn check_native(&mut self, status: NtStatus, origin: impl Into<Cow<'static, str>>) -> bool {
        let ok = nt_success(status);
        if !ok {
            self.capture(status as u32, origin.into());
        }
        ok
    }

    /// Acceptance test for the probe-then-fill pattern: the probe call must
    /// have failed with insufficient-buffer, and the reported size must be
    /// strictly positive and within [`MAX_BUFFER_SIZE`].
    ///
    /// An oversized probe is captured as [`win32::ERROR_IMPLEMENTATION_LIMIT`]
    /// regardless of the underlying platform error.
    pub fn check_buffer(
        &mut self,
        api: &dyn ProcessApi,
        required: u32,
        origin: impl Into<Cow<'static, str>>,
    ) -> bool {
        if required > MAX_BUFFER_SIZE {
            self.capture(win32::ERROR_IMPLEMENTATION_LIMIT, origin.into());
            return false;
        }
        let last = api.last_error();
        if required == 0 || last != win32::ERROR_INSUFFICIENT_BUFFER {
            self.capture(last, origin.into());
            return false;
        }
        true
    }

    fn capture(&mut self, code: u32, origin: Cow<'static, str>) {
        self.value = None;
        self.code = code;
        self.origin = Some(origin);
    }

    /// The captured failure, if any, as a [`LocatedError`].
    pub fn failure(&self) -> Option<LocatedError> {
        let origin = self.origin.clone()?;
        Some(match self.context.clone() {
            Some(context) => LocatedError::with_context(self.code, origin, context),
            None => LocatedError::new(self.code, origin),
        })
    }

    /// The single bridge from the non-propagating wrapper style into
    /// `?`-style propagation: the value if valid, otherwise the captured
    /// failure.
    pub fn into_value(mut self) -> Result<T, LocatedError> {
        match self.value.take() {
            Some(value) => Ok(value),
            None => Err(self.failure().unwrap_or_else(|| {
                // A wrapper that was neither accepted nor failed a check.
                LocatedError::new(win32::ERROR_INTERNAL_ERROR, "OperationResult")
            })),
        }
    }
}
