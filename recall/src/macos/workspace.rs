use std::process::Command;
use std::time::Duration;

use objc2_app_kit::{
    NSApplicationActivationOptions, NSApplicationActivationPolicy, NSRunningApplication,
    NSWorkspace,
};

use crate::platform::{PlatformError, RunningApp};
use crate::process::run_with_timeout;

const AUTOMATION_TIMEOUT: Duration = Duration::from_secs(5);

fn to_running_app(app: &NSRunningApplication) -> RunningApp {
    unsafe {
        RunningApp {
            pid: app.processIdentifier(),
            bundle_id: app.bundleIdentifier().map(|s| s.to_string()),
            name: app.localizedName().map(|s| s.to_string()),
        }
    }
}

/// Regular (Dock-visible) applications that are not hidden.
pub fn running_applications() -> Vec<RunningApp> {
    unsafe {
        let workspace = NSWorkspace::sharedWorkspace();
        workspace
            .runningApplications()
            .iter()
            .filter(|app| {
                app.activationPolicy() == NSApplicationActivationPolicy::Regular
                    && !app.isHidden()
            })
            .map(|app| to_running_app(&app))
            .collect()
    }
}

pub fn find_running_application(bundle_id: &str) -> Option<RunningApp> {
    unsafe {
        let workspace = NSWorkspace::sharedWorkspace();
        workspace
            .runningApplications()
            .iter()
            .find(|app| {
                app.bundleIdentifier()
                    .is_some_and(|id| id.to_string() == bundle_id)
            })
            .map(|app| to_running_app(&app))
    }
}

pub fn activate_application(pid: i32) {
    unsafe {
        let Some(app) = NSRunningApplication::runningApplicationWithProcessIdentifier(pid) else {
            tracing::warn!("No running application for pid {}", pid);
            return;
        };
        #[allow(deprecated)]
        let ok = app.activateWithOptions(NSApplicationActivationOptions::ActivateIgnoringOtherApps);
        if ok {
            tracing::debug!("Activated application pid {}", pid);
        } else {
            tracing::warn!("Failed to activate application pid {}", pid);
        }
    }
}

/// Launch an app by bundle identifier without bringing it to the front.
pub fn launch_application(bundle_id: &str, timeout: Duration) -> Result<(), PlatformError> {
    let mut cmd = Command::new("/usr/bin/open");
    cmd.args(["-g", "-b", bundle_id]);
    run_with_timeout(&mut cmd, timeout, &format!("launch of {}", bundle_id)).map_err(|e| match e {
        PlatformError::Automation { message } => PlatformError::Launch {
            bundle_id: bundle_id.to_string(),
            message,
        },
        other => other,
    })
}

/// Ask an app with no windows for a new document via AppleScript.
pub fn open_new_window(bundle_id: &str) -> Result<(), PlatformError> {
    let escaped = bundle_id.replace('\\', "\\\\").replace('"', "\\\"");
    let mut cmd = Command::new("/usr/bin/osascript");
    cmd.args([
        "-e",
        &format!("tell application id \"{}\"", escaped),
        "-e",
        "activate",
        "-e",
        "try",
        "-e",
        "make new document",
        "-e",
        "end try",
        "-e",
        "end tell",
    ]);
    run_with_timeout(&mut cmd, AUTOMATION_TIMEOUT, "new window script")
}

/// Open a file with its default application.
pub fn open_path(path: &std::path::Path) -> Result<(), PlatformError> {
    let mut cmd = Command::new("/usr/bin/open");
    cmd.arg(path);
    run_with_timeout(&mut cmd, AUTOMATION_TIMEOUT, "open")
}
