//! ntdll bindings behind the native process boundary.
//!
//! Declarations cover exactly the calls the launch sequence needs. Handle
//! newtypes from the core crate carry raw pointers across the boundary:
//! a `PathHandle` is a boxed `UNICODE_STRING` whose buffer ntdll allocated,
//! a `ParamBlockHandle` is the parameter-block pointer itself.

use std::ffi::c_void;

use tracing::debug;
use windows::Win32::Foundation::{GetLastError, HANDLE, UNICODE_STRING};
use windows::core::PWSTR;

use proclaunch_core::{
    BlockSpec, NtStatus, ParamBlockHandle, PathHandle, ProcessApi, ProcessHandles, TokenHandle,
    nt_success,
};

const RTL_USER_PROC_PARAMS_NORMALIZED: u32 = 0x0000_0001;
const PROCESS_ACCESS_TOKEN_CLASS: u32 = 9;

#[repr(C)]
struct ClientId {
    unique_process: *mut c_void,
    unique_thread: *mut c_void,
}

/// SECTION_IMAGE_INFORMATION, opaque at this boundary.
#[repr(C)]
struct SectionImageInformation {
    reserved: [u8; 64],
}

#[repr(C)]
struct RtlUserProcessInformation {
    length: u32,
    process: HANDLE,
    thread: HANDLE,
    client_id: ClientId,
    image_information: SectionImageInformation,
}

#[repr(C)]
struct ProcessAccessToken {
    token: HANDLE,
    thread: HANDLE,
}

#[link(name = "ntdll")]
unsafe extern "system" {
    fn RtlDosPathNameToNtPathName_U_WithStatus(
        dos_file_name: *const u16,
        nt_file_name: *mut UNICODE_STRING,
        file_part: *mut *mut u16,
        relative_name: *mut c_void,
    ) -> NtStatus;

    fn RtlFreeUnicodeString(string: *mut UNICODE_STRING);

    fn RtlCreateProcessParametersEx(
        process_parameters: *mut *mut c_void,
        image_path_name: *const UNICODE_STRING,
        dll_path: *const UNICODE_STRING,
        current_directory: *const UNICODE_STRING,
        command_line: *const UNICODE_STRING,
        environment: *mut c_void,
        window_title: *const UNICODE_STRING,
        desktop_info: *const UNICODE_STRING,
        shell_info: *const UNICODE_STRING,
        runtime_data: *const UNICODE_STRING,
        flags: u32,
    ) -> NtStatus;

    fn RtlDestroyProcessParameters(process_parameters: *mut c_void) -> NtStatus;

    fn RtlCreateUserProcess(
        image_path: *const UNICODE_STRING,
        attributes: u32,
        process_parameters: *mut c_void,
        process_security_descriptor: *mut c_void,
        thread_security_descriptor: *mut c_void,
        parent_process: HANDLE,
        inherit_handles: u8,
        debug_port: HANDLE,
        exception_port: HANDLE,
        process_information: *mut RtlUserProcessInformation,
    ) -> NtStatus;

    fn NtSetInformationProcess(
        process: HANDLE,
        information_class: u32,
        information: *const c_void,
        information_length: u32,
    ) -> NtStatus;

    fn NtResumeThread(thread: HANDLE, previous_suspend_count: *mut u32) -> NtStatus;

    fn NtClose(handle: HANDLE) -> NtStatus;
}

fn wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Build a UNICODE_STRING over a NUL-terminated UTF-16 buffer. The buffer
/// must outlive every use of the returned struct.
fn unicode_over(buffer: &mut [u16]) -> UNICODE_STRING {
    let characters = buffer.len() - 1;
    UNICODE_STRING {
        Length: (characters * 2) as u16,
        MaximumLength: (buffer.len() * 2) as u16,
        Buffer: PWSTR(buffer.as_mut_ptr()),
    }
}

fn as_handle(raw: isize) -> HANDLE {
    HANDLE(raw as *mut c_void)
}

/// [`ProcessApi`] over ntdll.
#[derive(Default)]
pub struct NtProcessApi;

impl NtProcessApi {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessApi for NtProcessApi {
    fn last_error(&self) -> u32 {
        GetLastError().0
    }

    fn normalize_path(&self, dos_path: &str) -> (NtStatus, PathHandle) {
        let buffer = wide(dos_path);
        let mut nt_name = UNICODE_STRING::default();
        let status = unsafe {
            RtlDosPathNameToNtPathName_U_WithStatus(
                buffer.as_ptr(),
                &mut nt_name,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if !nt_success(status) {
            return (status, PathHandle::default());
        }
        (status, PathHandle(Box::into_raw(Box::new(nt_name)) as u64))
    }

    fn release_path(&self, path: PathHandle) {
        if path.is_null() {
            return;
        }
        unsafe {
            let mut nt_name = Box::from_raw(path.0 as *mut UNICODE_STRING);
            RtlFreeUnicodeString(nt_name.as_mut());
        }
    }

    fn create_parameter_block(&self, spec: &BlockSpec<'_>) -> (NtStatus, ParamBlockHandle) {
        let image = spec.image_path.0 as *const UNICODE_STRING;

        let mut command_buffer = wide(spec.command_line);
        let command = unicode_over(&mut command_buffer);

        let mut directory_buffer = spec.working_directory.map(wide);
        let directory = directory_buffer.as_mut().map(|b| unicode_over(b));

        let mut desktop_buffer = spec.desktop.map(wide);
        let desktop = desktop_buffer.as_mut().map(|b| unicode_over(b));

        let mut block: *mut c_void = std::ptr::null_mut();
        let status = unsafe {
            RtlCreateProcessParametersEx(
                &mut block,
                image,
                std::ptr::null(),
                directory
                    .as_ref()
                    .map_or(std::ptr::null(), std::ptr::from_ref),
                &command,
                std::ptr::null_mut(), // inherit this process's environment
                std::ptr::null(),
                desktop
                    .as_ref()
                    .map_or(std::ptr::null(), std::ptr::from_ref),
                std::ptr::null(),
                std::ptr::null(),
                RTL_USER_PROC_PARAMS_NORMALIZED,
            )
        };
        if !nt_success(status) {
            return (status, ParamBlockHandle::default());
        }
        (status, ParamBlockHandle(block as u64))
    }

    fn destroy_parameter_block(&self, block: ParamBlockHandle) {
        if block.is_null() {
            return;
        }
        unsafe {
            let _ = RtlDestroyProcessParameters(block.0 as *mut c_void);
        }
    }

    fn create_user_process(
        &self,
        image: PathHandle,
        block: ParamBlockHandle,
        token: Option<TokenHandle>,
        inherit_handles: bool,
    ) -> (NtStatus, ProcessHandles) {
        let mut info: RtlUserProcessInformation = unsafe { std::mem::zeroed() };
        info.length = std::mem::size_of::<RtlUserProcessInformation>() as u32;

        let status = unsafe {
            RtlCreateUserProcess(
                image.0 as *const UNICODE_STRING,
                0,
                block.0 as *mut c_void,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                HANDLE::default(),
                u8::from(inherit_handles),
                HANDLE::default(),
                HANDLE::default(),
                &mut info,
            )
        };
        if !nt_success(status) {
            return (status, ProcessHandles::default());
        }

        let handles = ProcessHandles {
            process: info.process.0 as isize,
            thread: info.thread.0 as isize,
            process_id: info.client_id.unique_process as usize as u32,
        };

        // The primitive leaves the process suspended; a caller-supplied
        // primary token must be attached before the initial thread runs.
        if let Some(token) = token {
            let access = ProcessAccessToken {
                token: as_handle(token.0),
                thread: HANDLE::default(),
            };
            let token_status = unsafe {
                NtSetInformationProcess(
                    info.process,
                    PROCESS_ACCESS_TOKEN_CLASS,
                    std::ptr::from_ref(&access).cast(),
                    std::mem::size_of::<ProcessAccessToken>() as u32,
                )
            };
            if !nt_success(token_status) {
                self.close_process_handles(handles);
                return (token_status, ProcessHandles::default());
            }
        }

        debug!(process_id = handles.process_id, "native process created suspended");
        (status, handles)
    }

    fn resume_initial_thread(&self, handles: &ProcessHandles) -> NtStatus {
        unsafe { NtResumeThread(as_handle(handles.thread), std::ptr::null_mut()) }
    }

    fn close_process_handles(&self, handles: ProcessHandles) {
        unsafe {
            let _ = NtClose(as_handle(handles.thread));
            let _ = NtClose(as_handle(handles.process));
        }
    }
}
