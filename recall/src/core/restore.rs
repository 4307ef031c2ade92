use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use recall_layout::{find_best_match, Layout, WindowSnapshot};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::config::RestoreTiming;
use crate::platform::{LiveWindow, PlatformError, RunningApp, WindowManipulator};

/// Why a single window could not be restored. Only ever logged; callers see counts.
#[derive(Debug, thiserror::Error)]
pub enum RestoreFailure {
    #[error("could not launch {bundle_id}: {reason}")]
    Launch { bundle_id: String, reason: String },

    #[error("no live window to match for {bundle_id}")]
    MatchNotFound { bundle_id: String },

    #[error("failed to apply frame (position: {position:?}, size: {size:?})")]
    FrameApply {
        position: Option<String>,
        size: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
    pub total: usize,
}

/// How a finished restore should be reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing to restore at all, usually because capture had no permission.
    PermissionLikely,
    Partial,
    Complete,
}

impl RestoreSummary {
    pub fn outcome(&self) -> RestoreOutcome {
        if self.total == 0 {
            RestoreOutcome::PermissionLikely
        } else if self.restored < self.total {
            RestoreOutcome::Partial
        } else {
            RestoreOutcome::Complete
        }
    }
}

/// Runs restores on a background task, one at a time.
pub struct Restorer<P> {
    platform: Arc<P>,
    timing: RestoreTiming,
    in_flight: Arc<Mutex<()>>,
}

impl<P> Clone for Restorer<P> {
    fn clone(&self) -> Self {
        Self {
            platform: Arc::clone(&self.platform),
            timing: self.timing,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<P> Restorer<P>
where
    P: WindowManipulator + Send + Sync + 'static,
{
    pub fn new(platform: Arc<P>, timing: RestoreTiming) -> Self {
        Self {
            platform,
            timing,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Start restoring `layout` without blocking the caller.
    ///
    /// Restores queue behind each other so their window-control calls never
    /// interleave. A started restore always runs to completion.
    pub fn spawn(&self, layout: Layout) -> JoinHandle<RestoreSummary> {
        let platform = Arc::clone(&self.platform);
        let timing = self.timing;
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            let _guard = in_flight.lock_owned().await;
            let total = layout.window_count();
            let name = layout.name().to_string();

            let result = tokio::task::spawn_blocking(move || {
                restore_layout(platform.as_ref(), &layout, &timing)
            })
            .await;

            match result {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!("Restore of '{}' aborted: {}", name, e);
                    RestoreSummary { restored: 0, total }
                }
            }
        })
    }
}

/// Restore every window of `layout`, in stored display/window order.
pub fn restore_layout<P: WindowManipulator>(
    platform: &P,
    layout: &Layout,
    timing: &RestoreTiming,
) -> RestoreSummary {
    tracing::info!(
        "Restoring layout '{}' ({} displays)",
        layout.name(),
        layout.displays().len()
    );

    let mut failed_launches: HashSet<String> = HashSet::new();
    let mut restored = 0;
    let total = layout.window_count();

    for (display_snapshot, snapshot) in layout.windows() {
        tracing::debug!(
            "Restoring {} '{}' (display {})",
            snapshot.bundle_id(),
            snapshot.window_title(),
            display_snapshot.display_uuid
        );
        match restore_window(platform, snapshot, timing, &mut failed_launches) {
            Ok(()) => restored += 1,
            Err(e) => tracing::warn!(
                "Could not restore {} '{}': {}",
                snapshot.bundle_id(),
                snapshot.window_title(),
                e
            ),
        }
    }

    tracing::info!("Restore complete: {}/{}", restored, total);
    RestoreSummary { restored, total }
}

fn restore_window<P: WindowManipulator>(
    platform: &P,
    snapshot: &WindowSnapshot,
    timing: &RestoreTiming,
    failed_launches: &mut HashSet<String>,
) -> Result<(), RestoreFailure> {
    let bundle_id = snapshot.bundle_id();
    let app = ensure_running(platform, bundle_id, timing, failed_launches)?;
    tracing::debug!("{} running as pid {}", bundle_id, app.pid);

    let windows = current_windows(platform, &app, timing);
    for w in &windows {
        tracing::debug!("  Window: {}", w.title);
    }

    let titles: Vec<&str> = windows.iter().map(|w| w.title.as_str()).collect();
    let Some(found) = find_best_match(&titles, snapshot) else {
        return Err(RestoreFailure::MatchNotFound {
            bundle_id: bundle_id.to_string(),
        });
    };
    tracing::debug!(
        "Matched '{}' to '{}' by {}",
        snapshot.window_title(),
        titles[found.index],
        found.strategy
    );

    apply_frame(platform, &windows[found.index].handle, snapshot, timing)
}

fn ensure_running<P: WindowManipulator>(
    platform: &P,
    bundle_id: &str,
    timing: &RestoreTiming,
    failed_launches: &mut HashSet<String>,
) -> Result<RunningApp, RestoreFailure> {
    let launch_failed = |reason: String| RestoreFailure::Launch {
        bundle_id: bundle_id.to_string(),
        reason,
    };

    if let Some(app) = platform.find_running_application(bundle_id) {
        return Ok(app);
    }
    if failed_launches.contains(bundle_id) {
        return Err(launch_failed("earlier launch attempt failed".to_string()));
    }

    tracing::info!("{} not running, launching", bundle_id);
    if let Err(e) = platform.launch_application(bundle_id, timing.launch_timeout) {
        failed_launches.insert(bundle_id.to_string());
        return Err(launch_failed(e.to_string()));
    }
    settle(timing.launch_settle);

    platform.find_running_application(bundle_id).ok_or_else(|| {
        failed_launches.insert(bundle_id.to_string());
        launch_failed("no running instance after launch".to_string())
    })
}

/// Live windows of `app`, nudging it to open one when it has none.
fn current_windows<P: WindowManipulator>(
    platform: &P,
    app: &RunningApp,
    timing: &RestoreTiming,
) -> Vec<LiveWindow<P::Window>> {
    let windows = platform.all_windows(app.pid);
    if !windows.is_empty() {
        return windows;
    }

    tracing::debug!("pid {} has no windows, activating", app.pid);
    platform.activate_application(app.pid);
    settle(timing.activate_settle);
    let windows = platform.all_windows(app.pid);
    if !windows.is_empty() {
        return windows;
    }

    let Some(bundle_id) = app.bundle_id.as_deref() else {
        return windows;
    };
    tracing::debug!("Activation opened nothing, asking {} for a new window", bundle_id);
    if let Err(e) = platform.open_new_window(bundle_id) {
        tracing::warn!("New window request for {} failed: {}", bundle_id, e);
    }
    settle(timing.new_window_settle);
    platform.all_windows(app.pid)
}

fn apply_frame<P: WindowManipulator>(
    platform: &P,
    window: &P::Window,
    snapshot: &WindowSnapshot,
    timing: &RestoreTiming,
) -> Result<(), RestoreFailure> {
    let target = snapshot.frame();
    let before = platform.window_frame(window);

    let position = platform.set_window_position(window, target.x, target.y);
    let size = platform.set_window_size(window, target.width, target.height);

    settle(timing.frame_settle);
    match (before, platform.window_frame(window)) {
        (Some(before), Some(after)) => tracing::debug!(
            "Frame {} -> {} (target {}, moved: {})",
            before,
            after,
            target,
            before.x != after.x || before.y != after.y
        ),
        (_, after) => tracing::debug!("Frame now {:?} (target {})", after, target),
    }

    match (position, size) {
        (Ok(()), Ok(())) => Ok(()),
        (position, size) => Err(RestoreFailure::FrameApply {
            position: position.err().map(|e: PlatformError| e.to_string()),
            size: size.err().map(|e: PlatformError| e.to_string()),
        }),
    }
}

fn settle(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capture::capture_layout;
    use crate::platform::mock::{
        create_test_app, create_test_display, create_test_window, MockCall, MockPlatform,
    };
    use recall_layout::{DisplaySnapshot, WindowFrame};

    fn layout_of(snapshots: Vec<WindowSnapshot>) -> Layout {
        let mut display = DisplaySnapshot::new("MAIN-UUID");
        display.windows = snapshots;
        Layout::new("Test", vec![display])
    }

    fn snap(bundle_id: &str, title: &str, index: usize, frame: WindowFrame) -> WindowSnapshot {
        WindowSnapshot::new(bundle_id, title, index, frame)
    }

    #[test]
    fn test_capture_then_restore_identical_set_restores_all() {
        let platform = MockPlatform::new()
            .with_displays(vec![create_test_display(1, "MAIN-UUID", 0.0, 0.0, 1920.0, 1080.0)])
            .with_app(
                create_test_app(100, "com.apple.Terminal"),
                vec![
                    create_test_window(1, "Terminal — bash — 80×24", 0.0, 0.0, 800.0, 600.0),
                    create_test_window(2, "Terminal — vim — 80×24", 50.0, 50.0, 800.0, 600.0),
                ],
            )
            .with_app(
                create_test_app(200, "com.apple.Safari"),
                vec![create_test_window(3, "Safari", 900.0, 0.0, 1000.0, 1000.0)],
            );

        let layout = capture_layout("Same", &platform).unwrap();
        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());

        assert_eq!(summary.total, 3);
        assert_eq!(summary.restored, summary.total);
        assert_eq!(summary.outcome(), RestoreOutcome::Complete);

        // Exact-title matching means every window is set to its own frame.
        assert!(platform.calls().contains(&MockCall::SetPosition {
            id: 2,
            x: 50.0,
            y: 50.0
        }));
        assert_eq!(
            platform.frame_of(3),
            Some(WindowFrame::new(900.0, 0.0, 1000.0, 1000.0))
        );
    }

    #[test]
    fn test_moves_window_to_saved_frame() {
        let platform = MockPlatform::new().with_app(
            create_test_app(100, "com.apple.Notes"),
            vec![create_test_window(1, "Notes", 0.0, 0.0, 100.0, 100.0)],
        );
        let target = WindowFrame::new(200.0, 150.0, 640.0, 480.0);
        let layout = layout_of(vec![snap("com.apple.Notes", "Notes", 0, target)]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary, RestoreSummary { restored: 1, total: 1 });
        assert_eq!(platform.frame_of(1), Some(target));
    }

    #[test]
    fn test_positional_fallback_picks_index() {
        let platform = MockPlatform::new().with_app(
            create_test_app(100, "com.example.Editor"),
            (1..=5)
                .map(|i| create_test_window(i, &format!("Doc {}", i), 0.0, 0.0, 10.0, 10.0))
                .collect(),
        );
        let target = WindowFrame::new(1.0, 2.0, 3.0, 4.0);
        let layout = layout_of(vec![snap("com.example.Editor", "Zebra", 2, target)]);

        restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(platform.frame_of(3), Some(target));
    }

    #[test]
    fn test_empty_window_list_counts_as_failure() {
        let platform = MockPlatform::new().with_app(create_test_app(100, "com.apple.Preview"), vec![]);
        let layout = layout_of(vec![snap(
            "com.apple.Preview",
            "doc.pdf",
            0,
            WindowFrame::default(),
        )]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary, RestoreSummary { restored: 0, total: 1 });
        assert_eq!(summary.outcome(), RestoreOutcome::Partial);
        assert_eq!(
            platform.calls(),
            vec![
                MockCall::Activate { pid: 100 },
                MockCall::OpenNewWindow {
                    bundle_id: "com.apple.Preview".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_activation_recovers_window() {
        let platform = MockPlatform::new()
            .with_app(create_test_app(100, "com.apple.finder"), vec![])
            .with_windows_on_activate(
                100,
                vec![create_test_window(7, "Recents", 0.0, 0.0, 500.0, 400.0)],
            );
        let layout = layout_of(vec![snap(
            "com.apple.finder",
            "Downloads",
            0,
            WindowFrame::new(10.0, 10.0, 700.0, 500.0),
        )]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary.restored, 1);
        assert!(!platform
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::OpenNewWindow { .. })));
    }

    #[test]
    fn test_new_window_request_recovers_window() {
        let platform = MockPlatform::new()
            .with_app(create_test_app(100, "com.apple.TextEdit"), vec![])
            .with_windows_on_new_window(
                "com.apple.TextEdit",
                vec![create_test_window(9, "Untitled", 0.0, 0.0, 500.0, 400.0)],
            );
        let target = WindowFrame::new(30.0, 40.0, 600.0, 450.0);
        let layout = layout_of(vec![snap("com.apple.TextEdit", "Notes.txt", 0, target)]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary.restored, 1);
        assert_eq!(platform.frame_of(9), Some(target));
    }

    #[test]
    fn test_launches_app_that_is_not_running() {
        let platform = MockPlatform::new().with_launchable(
            create_test_app(300, "com.apple.Music"),
            vec![create_test_window(5, "Music", 0.0, 0.0, 800.0, 600.0)],
        );
        let target = WindowFrame::new(0.0, 25.0, 1000.0, 700.0);
        let layout = layout_of(vec![snap("com.apple.Music", "Music", 0, target)]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary.restored, 1);
        assert_eq!(
            platform.calls()[0],
            MockCall::Launch {
                bundle_id: "com.apple.Music".to_string()
            }
        );
        assert_eq!(platform.frame_of(5), Some(target));
    }

    #[test]
    fn test_failed_launch_fails_all_windows_of_that_app_once() {
        let platform = MockPlatform::new().with_app(
            create_test_app(100, "com.apple.Notes"),
            vec![create_test_window(1, "Notes", 0.0, 0.0, 100.0, 100.0)],
        );
        let layout = layout_of(vec![
            snap("com.example.Gone", "A", 0, WindowFrame::default()),
            snap("com.apple.Notes", "Notes", 0, WindowFrame::default()),
            snap("com.example.Gone", "B", 1, WindowFrame::default()),
        ]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary, RestoreSummary { restored: 1, total: 3 });

        let launches = platform
            .calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Launch { .. }))
            .count();
        assert_eq!(launches, 1);
    }

    #[test]
    fn test_frame_apply_failure_not_counted() {
        let platform = MockPlatform::new()
            .with_app(
                create_test_app(100, "com.apple.Notes"),
                vec![
                    create_test_window(1, "First", 0.0, 0.0, 100.0, 100.0),
                    create_test_window(2, "Second", 0.0, 0.0, 100.0, 100.0),
                ],
            )
            .with_failing_size(2);
        let layout = layout_of(vec![
            snap("com.apple.Notes", "First", 0, WindowFrame::new(1.0, 1.0, 50.0, 50.0)),
            snap("com.apple.Notes", "Second", 1, WindowFrame::new(2.0, 2.0, 60.0, 60.0)),
        ]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary, RestoreSummary { restored: 1, total: 2 });
        // Position is still attempted even though the size call fails.
        assert!(platform.calls().contains(&MockCall::SetPosition {
            id: 2,
            x: 2.0,
            y: 2.0
        }));
    }

    #[test]
    fn test_position_failure_not_counted() {
        let platform = MockPlatform::new()
            .with_app(
                create_test_app(100, "com.apple.Notes"),
                vec![create_test_window(1, "Notes", 0.0, 0.0, 100.0, 100.0)],
            )
            .with_failing_position(1);
        let target = WindowFrame::new(40.0, 30.0, 640.0, 480.0);
        let layout = layout_of(vec![snap("com.apple.Notes", "Notes", 0, target)]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary, RestoreSummary { restored: 0, total: 1 });
        // Size is still applied even though the move failed.
        assert_eq!(
            platform.frame_of(1),
            Some(WindowFrame::new(0.0, 0.0, 640.0, 480.0))
        );
    }

    #[test]
    fn test_total_counts_windows_across_displays() {
        let platform = MockPlatform::new();
        let mut a = DisplaySnapshot::new("A");
        a.windows.push(snap("x.a", "1", 0, WindowFrame::default()));
        let mut b = DisplaySnapshot::new("B");
        b.windows.push(snap("x.b", "2", 0, WindowFrame::default()));
        b.windows.push(snap("x.b", "3", 1, WindowFrame::default()));
        let layout = Layout::new("Multi", vec![a, b]);

        let summary = restore_layout(&platform, &layout, &RestoreTiming::immediate());
        assert_eq!(summary, RestoreSummary { restored: 0, total: 3 });
    }

    #[test]
    fn test_outcome_reporting() {
        assert_eq!(
            RestoreSummary { restored: 0, total: 0 }.outcome(),
            RestoreOutcome::PermissionLikely
        );
        assert_eq!(
            RestoreSummary { restored: 2, total: 3 }.outcome(),
            RestoreOutcome::Partial
        );
        assert_eq!(
            RestoreSummary { restored: 3, total: 3 }.outcome(),
            RestoreOutcome::Complete
        );
    }

    #[tokio::test]
    async fn test_spawned_restore_reports_counts() {
        let platform = Arc::new(MockPlatform::new().with_app(
            create_test_app(100, "com.apple.Notes"),
            vec![create_test_window(1, "Notes", 0.0, 0.0, 100.0, 100.0)],
        ));
        let restorer = Restorer::new(Arc::clone(&platform), RestoreTiming::immediate());
        let layout = layout_of(vec![snap(
            "com.apple.Notes",
            "Notes",
            0,
            WindowFrame::new(5.0, 5.0, 300.0, 200.0),
        )]);

        let summary = restorer.spawn(layout).await.unwrap();
        assert_eq!(summary, RestoreSummary { restored: 1, total: 1 });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_restores_are_serialized() {
        let windows: Vec<_> = (1..=4)
            .map(|i| create_test_window(i, &format!("Win {}", i), 0.0, 0.0, 100.0, 100.0))
            .collect();
        let platform = Arc::new(
            MockPlatform::new()
                .with_app(create_test_app(100, "com.example.App"), windows)
                .with_control_delay(Duration::from_millis(5)),
        );
        let restorer = Restorer::new(Arc::clone(&platform), RestoreTiming::immediate());

        let make = |offset: f64| {
            layout_of(
                (1..=4)
                    .map(|i| {
                        snap(
                            "com.example.App",
                            &format!("Win {}", i),
                            (i - 1) as usize,
                            WindowFrame::new(offset, offset, 100.0, 100.0),
                        )
                    })
                    .collect(),
            )
        };

        let first = restorer.spawn(make(10.0));
        let second = restorer.clone().spawn(make(20.0));
        let (a, b) = tokio::join!(first, second);

        assert_eq!(a.unwrap().restored, 4);
        assert_eq!(b.unwrap().restored, 4);
        assert_eq!(platform.max_concurrent_controls(), 1);
    }
}
