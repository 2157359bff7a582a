//! Launch parameter catalog and providers.
//!
//! The catalog is a closed enumeration shared by all strategies: adding a
//! knob means revisiting every strategy's capability declaration.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{LaunchError, Result};
use crate::native::TokenHandle;

/// One optional launch knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LaunchParam {
    ApplicationPath,
    CommandLine,
    WorkingDirectory,
    Desktop,
    InheritHandles,
    CreateSuspended,
    Token,
}

impl LaunchParam {
    /// Every knob in the catalog, in declaration order.
    pub const ALL: [LaunchParam; 7] = [
        LaunchParam::ApplicationPath,
        LaunchParam::CommandLine,
        LaunchParam::WorkingDirectory,
        LaunchParam::Desktop,
        LaunchParam::InheritHandles,
        LaunchParam::CreateSuspended,
        LaunchParam::Token,
    ];
}

/// Supplies concrete parameter values for one launch attempt and declares
/// which optional parameters are present.
///
/// `provides` must stay consistent for the duration of one
/// dispatch-and-execute cycle.
pub trait LaunchProvider {
    fn provides(&self, param: LaunchParam) -> bool;

    fn application_path(&self) -> Option<&str>;

    fn command_line(&self) -> Option<&str>;

    fn working_directory(&self) -> Option<&str>;

    fn desktop(&self) -> Option<&str>;

    fn inherit_handles(&self) -> Option<bool>;

    fn create_suspended(&self) -> Option<bool>;

    fn token(&self) -> Option<TokenHandle>;

    /// The knobs this provider supplies, in catalog order.
    fn provided_params(&self) -> Vec<LaunchParam> {
        LaunchParam::ALL
            .into_iter()
            .filter(|&param| self.provides(param))
            .collect()
    }
}

/// Concrete provider: one launch attempt's worth of parameters.
///
/// Built with the generated builder and discarded after the attempt:
///
/// ```
/// use proclaunch_core::LaunchRequest;
///
/// let request = LaunchRequest::builder()
///     .application_path(r"C:\Windows\System32\cmd.exe")
///     .command_line("/c whoami")
///     .build()
///     .unwrap();
/// assert!(request.validate().is_ok());
/// ```
#[derive(Default, Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into, strip_option), default)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchRequest {
    pub application_path: Option<String>,
    pub command_line: Option<String>,
    pub working_directory: Option<String>,
    pub desktop: Option<String>,
    pub inherit_handles: Option<bool>,
    pub create_suspended: Option<bool>,
    /// Raw token handles do not survive serialization.
    #[serde(skip)]
    pub token: Option<TokenHandle>,
}

impl LaunchRequest {
    pub fn builder() -> LaunchRequestBuilder {
        LaunchRequestBuilder::default()
    }

    /// Reject requests that cannot be represented in native strings before
    /// any native call is attempted.
    pub fn validate(&self) -> Result<()> {
        let path = self
            .application_path
            .as_deref()
            .ok_or(LaunchError::MissingApplicationPath)?;
        if path.trim().is_empty() {
            return Err(LaunchError::MissingApplicationPath);
        }

        let fields = [
            ("applicationPath", self.application_path.as_deref()),
            ("commandLine", self.command_line.as_deref()),
            ("workingDirectory", self.working_directory.as_deref()),
            ("desktop", self.desktop.as_deref()),
        ];
        for (name, value) in fields {
            if value.is_some_and(|v| v.contains('\0')) {
                return Err(LaunchError::Conversion {
                    what: name,
                    message: "embedded NUL is not representable in a native string".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl LaunchProvider for LaunchRequest {
    fn provides(&self, param: LaunchParam) -> bool {
        match param {
            LaunchParam::ApplicationPath => self.application_path.is_some(),
            LaunchParam::CommandLine => self.command_line.is_some(),
            LaunchParam::WorkingDirectory => self.working_directory.is_some(),
            LaunchParam::Desktop => self.desktop.is_some(),
            LaunchParam::InheritHandles => self.inherit_handles.is_some(),
            LaunchParam::CreateSuspended => self.create_suspended.is_some(),
            LaunchParam::Token => self.token.is_some(),
        }
    }

    fn application_path(&self) -> Option<&str> {
        self.application_path.as_deref()
    }

    fn command_line(&self) -> Option<&str> {
        self.command_line.as_deref()
    }

    fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    fn desktop(&self) -> Option<&str> {
        self.desktop.as_deref()
    }

    fn inherit_handles(&self) -> Option<bool> {
        self.inherit_handles
    }

    fn create_suspended(&self) -> Option<bool> {
        self.create_suspended
    }

    fn token(&self) -> Option<TokenHandle> {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_leave_knobs_absent() {
        let request = LaunchRequest::builder()
            .application_path(r"C:\tools\admin.exe")
            .build()
            .unwrap();
        assert_eq!(request.provided_params(), vec![LaunchParam::ApplicationPath]);
        assert!(request.provides(LaunchParam::ApplicationPath));
        assert!(!request.provides(LaunchParam::CommandLine));
        assert!(!request.provides(LaunchParam::Token));
    }

    #[test]
    fn provided_params_follow_catalog_order() {
        let request = LaunchRequest::builder()
            .application_path(r"C:\tools\admin.exe")
            .desktop(r"winsta0\default")
            .create_suspended(true)
            .build()
            .unwrap();
        assert_eq!(
            request.provided_params(),
            vec![
                LaunchParam::ApplicationPath,
                LaunchParam::Desktop,
                LaunchParam::CreateSuspended,
            ]
        );
    }

    #[test]
    fn validate_requires_an_application_path() {
        let empty = LaunchRequest::default();
        assert!(matches!(
            empty.validate(),
            Err(LaunchError::MissingApplicationPath)
        ));

        let blank = LaunchRequest::builder().application_path("   ").build().unwrap();
        assert!(matches!(
            blank.validate(),
            Err(LaunchError::MissingApplicationPath)
        ));
    }

    #[test]
    fn validate_rejects_embedded_nul_as_conversion_error() {
        let request = LaunchRequest::builder()
            .application_path(r"C:\tools\admin.exe")
            .command_line("run\0me")
            .build()
            .unwrap();
        match request.validate() {
            Err(LaunchError::Conversion { what, .. }) => assert_eq!(what, "commandLine"),
            other => panic!("expected a conversion error, got {other:?}"),
        }
    }

    #[test]
    fn serde_round_trip_uses_camel_case() {
        let request = LaunchRequest::builder()
            .application_path(r"C:\tools\admin.exe")
            .working_directory(r"C:\tools")
            .inherit_handles(false)
            .build()
            .unwrap();

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("applicationPath"));
        assert!(json.contains("workingDirectory"));

        let parsed: LaunchRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn token_does_not_serialize() {
        let request = LaunchRequest::builder()
            .application_path(r"C:\tools\admin.exe")
            .token(TokenHandle(0x1234))
            .build()
            .unwrap();
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("token"));

        let parsed: LaunchRequest = serde_json::from_str(&json).unwrap();
        assert!(parsed.token.is_none());
    }
}
