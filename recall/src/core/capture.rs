use std::collections::HashMap;

use recall_layout::{DisplaySnapshot, Layout, WindowSnapshot};

use crate::platform::{DisplayInfo, WindowSystem};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("layout name must not be empty")]
    EmptyName,

    /// Apps were running but none of their windows were readable, which almost
    /// always means Accessibility permission is missing.
    #[error("no windows captured from {app_count} running applications")]
    NoWindowsCaptured { app_count: usize },
}

/// Display whose bounds contain the point, falling back to the main display.
pub fn display_for_point(displays: &[DisplayInfo], x: f64, y: f64) -> Option<&DisplayInfo> {
    displays
        .iter()
        .find(|d| d.frame.contains(x, y))
        .or_else(|| displays.iter().find(|d| d.is_main))
}

/// Snapshot the windows of all regular, visible applications.
pub fn capture_layout<W: WindowSystem>(name: &str, ws: &W) -> Result<Layout, CaptureError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CaptureError::EmptyName);
    }

    let apps = ws.running_applications();
    let displays = ws.get_all_displays();
    tracing::debug!(
        "Capturing '{}': {} applications, {} displays",
        name,
        apps.len(),
        displays.len()
    );

    let mut snapshots: Vec<DisplaySnapshot> = Vec::new();
    let mut window_indices: HashMap<String, usize> = HashMap::new();

    for app in &apps {
        let Some(bundle_id) = app.bundle_id.as_deref() else {
            tracing::debug!("Skipping pid {} without bundle id", app.pid);
            continue;
        };

        for window in ws.standard_windows(app.pid) {
            let (cx, cy) = window.frame.center();
            let Some(uuid) = display_for_point(&displays, cx, cy).and_then(|d| d.uuid.as_deref())
            else {
                tracing::debug!(
                    "No display for window '{}' of {} at ({}, {})",
                    window.title,
                    bundle_id,
                    cx,
                    cy
                );
                continue;
            };

            let index = window_indices.entry(bundle_id.to_string()).or_insert(0);
            let snapshot = WindowSnapshot::new(bundle_id, window.title, *index, window.frame);
            *index += 1;

            tracing::debug!(
                "  [{}] {} #{} '{}' {}",
                uuid,
                bundle_id,
                snapshot.window_index(),
                snapshot.window_title(),
                snapshot.frame()
            );

            match snapshots.iter_mut().find(|d| d.display_uuid == uuid) {
                Some(display) => display.windows.push(snapshot),
                None => {
                    let mut display = DisplaySnapshot::new(uuid);
                    display.windows.push(snapshot);
                    snapshots.push(display);
                }
            }
        }
    }

    let layout = Layout::new(name, snapshots);
    let total = layout.window_count();

    if !apps.is_empty() && total == 0 {
        tracing::warn!(
            "No windows captured despite {} running apps - likely a permission issue",
            apps.len()
        );
        return Err(CaptureError::NoWindowsCaptured {
            app_count: apps.len(),
        });
    }

    tracing::info!(
        "Captured layout '{}': {} windows on {} displays",
        name,
        total,
        layout.displays().len()
    );
    Ok(layout)
}
