//! Windows implementation of the native process boundary.

#[cfg(windows)]
mod nt_api;

#[cfg(windows)]
pub use nt_api::NtProcessApi;

/// Windows factory for the native boundary
pub struct WindowsProcessApiFactory;

#[cfg(windows)]
impl proclaunch_core::ProcessApiFactory for WindowsProcessApiFactory {
    fn create_api() -> std::sync::Arc<dyn proclaunch_core::ProcessApi> {
        std::sync::Arc::new(NtProcessApi::new())
    }

    fn platform_name() -> &'static str {
        "Windows"
    }
}
