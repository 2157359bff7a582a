use std::sync::{Arc, Mutex, PoisonError};

use proclaunch::{
    ErrorObserver, LaunchError, LaunchRequest, Launcher,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_file(true)
        .with_thread_ids(false)
        .with_target(false)
        .with_line_number(true)
        .try_init();
}

#[derive(Default)]
struct CollectingObserver {
    seen: Mutex<Vec<String>>,
}

impl ErrorObserver for CollectingObserver {
    fn on_error(&self, error: &LaunchError) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error.to_string());
    }
}

impl CollectingObserver {
    fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Launch a real process end to end through the platform strategy set.
#[cfg(unix)]
#[test]
fn test_launch_through_platform_strategies() {
    init_tracing();

    let launcher = Launcher::with_platform_strategies();
    let request = LaunchRequest::builder()
        .application_path("true")
        .build()
        .unwrap();

    let report = launcher.launch(&request).unwrap();
    assert!(report.process_id > 0);
    assert!(!report.left_suspended);
}

#[test]
fn test_validation_failure_notifies_observers() {
    init_tracing();

    let launcher = Launcher::with_platform_strategies();
    let observer = Arc::new(CollectingObserver::default());
    launcher.observers().subscribe(observer.clone());

    let error = launcher.launch(&LaunchRequest::default()).unwrap_err();
    assert!(error.is_configuration());
    assert_eq!(observer.seen().len(), 1);
    assert!(observer.seen()[0].contains("application path"));
}

#[cfg(not(windows))]
#[test]
fn test_unsupported_knobs_fail_negotiation_before_spawn() {
    use proclaunch::TokenHandle;

    init_tracing();

    let launcher = Launcher::with_platform_strategies();
    let observer = Arc::new(CollectingObserver::default());
    launcher.observers().subscribe(observer.clone());

    let request = LaunchRequest::builder()
        .application_path("true")
        .token(TokenHandle(7))
        .build()
        .unwrap();
    let error = launcher.launch(&request).unwrap_err();
    assert!(matches!(error, LaunchError::UnsupportedParameterSet { .. }));
    assert_eq!(observer.seen().len(), 1);
}

#[test]
fn test_request_from_json_configuration() {
    init_tracing();

    let request: LaunchRequest = serde_json::from_str(
        r#"{
            "applicationPath": "true",
            "commandLine": "",
            "inheritHandles": false
        }"#,
    )
    .unwrap();
    assert_eq!(request.application_path.as_deref(), Some("true"));
    assert_eq!(request.inherit_handles, Some(false));
    assert!(request.validate().is_ok());
}
