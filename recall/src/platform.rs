use std::time::Duration;

use recall_layout::WindowFrame;

pub type DisplayId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct RunningApp {
    pub pid: i32,
    pub bundle_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayInfo {
    pub id: DisplayId,
    /// Persistent per-monitor identifier. `None` when the OS could not provide one.
    pub uuid: Option<String>,
    pub frame: Bounds,
    pub is_main: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Half-open containment: a point on the right or bottom edge belongs to the neighbour.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// A standard top-level window as seen during capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedWindow {
    pub title: String,
    pub frame: WindowFrame,
}

/// A live window paired with a handle that is only valid for the current operation.
#[derive(Debug, Clone)]
pub struct LiveWindow<W> {
    pub title: String,
    pub handle: W,
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("accessibility call failed with error {code}")]
    Accessibility { code: i32 },

    #[error("failed to launch {bundle_id}: {message}")]
    Launch { bundle_id: String, message: String },

    #[error("automation failed: {message}")]
    Automation { message: String },

    #[error("{what} did not finish within {timeout:?}")]
    Timeout { what: String, timeout: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Trait for querying applications, windows and displays from the system.
/// This abstraction allows mocking in tests.
pub trait WindowSystem {
    /// Opaque window handle. Never stored beyond the operation that obtained it.
    type Window;

    /// Running apps with a regular activation policy that are not hidden.
    fn running_applications(&self) -> Vec<RunningApp>;
    fn find_running_application(&self, bundle_id: &str) -> Option<RunningApp>;
    fn get_all_displays(&self) -> Vec<DisplayInfo>;
    /// Standard, non-minimized top-level windows of `pid`, excluding dialogs and floating panels.
    fn standard_windows(&self, pid: i32) -> Vec<CapturedWindow>;
    /// Every window of `pid` that has a readable title, in the order the OS reports them.
    fn all_windows(&self, pid: i32) -> Vec<LiveWindow<Self::Window>>;
    fn window_frame(&self, window: &Self::Window) -> Option<WindowFrame>;
    fn request_accessibility_permission(&self);
}

/// Trait for manipulating windows and applications (side effects).
/// This abstraction allows mocking in tests.
pub trait WindowManipulator: WindowSystem {
    fn set_window_position(&self, window: &Self::Window, x: f64, y: f64)
        -> Result<(), PlatformError>;
    fn set_window_size(&self, window: &Self::Window, width: f64, height: f64)
        -> Result<(), PlatformError>;
    /// Launch without activating. Blocks until the OS acknowledges or `timeout` passes.
    fn launch_application(&self, bundle_id: &str, timeout: Duration) -> Result<(), PlatformError>;
    fn activate_application(&self, pid: i32);
    /// Ask the app for a new document window through automation.
    fn open_new_window(&self, bundle_id: &str) -> Result<(), PlatformError>;
}

/// macOS implementation of WindowSystem and WindowManipulator
#[cfg(target_os = "macos")]
#[derive(Debug, Default, Clone, Copy)]
pub struct MacOSPlatform;

#[cfg(target_os = "macos")]
mod macos_impl {
    use super::*;
    use crate::macos::{self, AXUIElement};
    use core_graphics::geometry::{CGPoint, CGSize};

    const IGNORED_SUBROLES: [&str; 3] = ["AXDialog", "AXSystemDialog", "AXFloatingWindow"];
    const WINDOW_ROLE: &str = "AXWindow";

    fn ax_frame(window: &AXUIElement) -> Option<WindowFrame> {
        let pos = window.position().ok()?;
        let size = window.size().ok()?;
        Some(WindowFrame::new(pos.x, pos.y, size.width, size.height))
    }

    impl WindowSystem for MacOSPlatform {
        type Window = AXUIElement;

        fn running_applications(&self) -> Vec<RunningApp> {
            macos::running_applications()
        }

        fn find_running_application(&self, bundle_id: &str) -> Option<RunningApp> {
            macos::find_running_application(bundle_id)
        }

        fn get_all_displays(&self) -> Vec<DisplayInfo> {
            macos::get_all_displays()
        }

        fn standard_windows(&self, pid: i32) -> Vec<CapturedWindow> {
            let app = AXUIElement::application(pid);
            let ax_windows = match app.windows() {
                Ok(w) => w,
                Err(e) => {
                    tracing::debug!("Failed to get windows for pid {}: {}", pid, e);
                    return Vec::new();
                }
            };

            let mut result = Vec::new();
            for ax_win in ax_windows {
                if ax_win.is_minimized().unwrap_or(false) {
                    continue;
                }
                if let Ok(role) = ax_win.role() {
                    if role != WINDOW_ROLE {
                        continue;
                    }
                }
                if let Ok(subrole) = ax_win.subrole() {
                    if IGNORED_SUBROLES.contains(&subrole.as_str()) {
                        continue;
                    }
                }
                let Ok(title) = ax_win.title() else {
                    continue;
                };
                let Some(frame) = ax_frame(&ax_win) else {
                    continue;
                };
                result.push(CapturedWindow { title, frame });
            }
            result
        }

        fn all_windows(&self, pid: i32) -> Vec<LiveWindow<AXUIElement>> {
            let app = AXUIElement::application(pid);
            match app.windows() {
                Ok(windows) => windows
                    .into_iter()
                    .filter_map(|w| {
                        let title = w.title().ok()?;
                        Some(LiveWindow { title, handle: w })
                    })
                    .collect(),
                Err(e) => {
                    if e == macos::AX_ERROR_API_DISABLED {
                        tracing::error!("Accessibility API is disabled; permission is required");
                    } else {
                        tracing::warn!("Failed to get windows for pid {}: {}", pid, e);
                    }
                    Vec::new()
                }
            }
        }

        fn window_frame(&self, window: &AXUIElement) -> Option<WindowFrame> {
            ax_frame(window)
        }

        fn request_accessibility_permission(&self) {
            if !macos::is_trusted_with_prompt() {
                tracing::warn!("Accessibility permission not granted");
            }
        }
    }

    impl WindowManipulator for MacOSPlatform {
        fn set_window_position(
            &self,
            window: &AXUIElement,
            x: f64,
            y: f64,
        ) -> Result<(), PlatformError> {
            window
                .set_position(CGPoint::new(x, y))
                .map_err(|code| PlatformError::Accessibility { code })
        }

        fn set_window_size(
            &self,
            window: &AXUIElement,
            width: f64,
            height: f64,
        ) -> Result<(), PlatformError> {
            window
                .set_size(CGSize::new(width, height))
                .map_err(|code| PlatformError::Accessibility { code })
        }

        fn launch_application(
            &self,
            bundle_id: &str,
            timeout: Duration,
        ) -> Result<(), PlatformError> {
            macos::launch_application(bundle_id, timeout)
        }

        fn activate_application(&self, pid: i32) {
            macos::activate_application(pid);
        }

        fn open_new_window(&self, bundle_id: &str) -> Result<(), PlatformError> {
            macos::open_new_window(bundle_id)
        }
    }
}
