use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::title::normalize;

/// Format version written by this build.
pub const CURRENT_VERSION: u32 = 1;

/// Window rectangle in global screen coordinates (top-left origin, Y down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WindowFrame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl std::fmt::Display for WindowFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}) {}x{}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Identity and geometry of one window at capture time.
///
/// `stable_title` is derived from `window_title` on construction. When read back
/// from disk it is kept exactly as stored, so files written by older normalizers
/// keep matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    bundle_id: String,
    window_title: String,
    stable_title: String,
    window_index: usize,
    frame: WindowFrame,
}

impl WindowSnapshot {
    pub fn new(
        bundle_id: impl Into<String>,
        window_title: impl Into<String>,
        window_index: usize,
        frame: WindowFrame,
    ) -> Self {
        let window_title = window_title.into();
        let stable_title = normalize(&window_title);
        Self {
            bundle_id: bundle_id.into(),
            window_title,
            stable_title,
            window_index,
            frame,
        }
    }

    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn stable_title(&self) -> &str {
        &self.stable_title
    }

    /// Position among the owning app's windows at capture time, counted across displays.
    pub fn window_index(&self) -> usize {
        self.window_index
    }

    pub fn frame(&self) -> &WindowFrame {
        &self.frame
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub display_uuid: String,
    pub windows: Vec<WindowSnapshot>,
}

impl DisplaySnapshot {
    pub fn new(display_uuid: impl Into<String>) -> Self {
        Self {
            display_uuid: display_uuid.into(),
            windows: Vec::new(),
        }
    }
}

/// A named, timestamped set of window positions across displays.
///
/// `name` is the only identity a layout has; storage, lookup and deletion all
/// go through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    version: u32,
    name: String,
    created_at: DateTime<Utc>,
    displays: Vec<DisplaySnapshot>,
}

impl Layout {
    pub fn new(name: impl Into<String>, displays: Vec<DisplaySnapshot>) -> Self {
        Self::with_timestamp(name, Utc::now().trunc_subsecs(0), displays)
    }

    pub fn with_timestamp(
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        displays: Vec<DisplaySnapshot>,
    ) -> Self {
        Self {
            version: CURRENT_VERSION,
            name: name.into(),
            created_at,
            displays,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn displays(&self) -> &[DisplaySnapshot] {
        &self.displays
    }

    /// Number of saved windows across all displays.
    pub fn window_count(&self) -> usize {
        self.displays.iter().map(|d| d.windows.len()).sum()
    }

    pub fn windows(&self) -> impl Iterator<Item = (&DisplaySnapshot, &WindowSnapshot)> {
        self.displays
            .iter()
            .flat_map(|d| d.windows.iter().map(move |w| (d, w)))
    }

    pub fn is_supported(&self) -> bool {
        self.version <= CURRENT_VERSION
    }

    /// Serialize as pretty-printed JSON with keys sorted at every level.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        // serde_json::Map is a BTreeMap, so going through Value sorts the keys.
        let value = serde_json::to_value(self)?;
        serde_json::to_string_pretty(&value)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_layout() -> Layout {
        let mut main = DisplaySnapshot::new("37D8832A-2D66-02CA-B9F7-8F30A301B230");
        main.windows.push(WindowSnapshot::new(
            "com.apple.Terminal",
            "Terminal — bash — 194×53",
            0,
            WindowFrame::new(0.0, 25.0, 1440.0, 875.0),
        ));
        main.windows.push(WindowSnapshot::new(
            "com.apple.Safari",
            "Safari",
            0,
            WindowFrame::new(100.5, 50.0, 800.0, 600.0),
        ));
        let mut side = DisplaySnapshot::new("9A1B2C3D-0000-0000-0000-000000000001");
        side.windows.push(WindowSnapshot::new(
            "com.apple.Terminal",
            "Terminal — zsh — 80×24",
            1,
            WindowFrame::new(1440.0, 0.0, 640.0, 480.0),
        ));
        Layout::with_timestamp(
            "Work",
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            vec![main, side],
        )
    }

    #[test]
    fn test_snapshot_derives_stable_title() {
        let snap = WindowSnapshot::new(
            "com.apple.mail",
            "Mail — Inbox — 3 unread",
            0,
            WindowFrame::default(),
        );
        assert_eq!(snap.stable_title(), "Mail — Inbox");
        assert_eq!(snap.window_title(), "Mail — Inbox — 3 unread");
    }

    #[test]
    fn test_window_count() {
        assert_eq!(sample_layout().window_count(), 3);
        assert_eq!(Layout::new("Empty", vec![]).window_count(), 0);
    }

    #[test]
    fn test_frame_center() {
        let frame = WindowFrame::new(100.0, 50.0, 800.0, 600.0);
        assert_eq!(frame.center(), (500.0, 350.0));
    }

    #[test]
    fn test_new_layout_uses_current_version_and_whole_seconds() {
        let layout = Layout::new("Desk", vec![]);
        assert_eq!(layout.version(), CURRENT_VERSION);
        assert_eq!(layout.created_at().timestamp_subsec_nanos(), 0);
        assert!(layout.is_supported());
    }

    #[test]
    fn test_json_round_trip() {
        let layout = sample_layout();
        let json = layout.to_json_pretty().unwrap();
        let decoded = Layout::from_json(&json).unwrap();
        assert_eq!(decoded, layout);
    }

    #[test]
    fn test_json_uses_snake_case_keys_in_sorted_order() {
        let json = sample_layout().to_json_pretty().unwrap();
        assert!(json.contains("\"created_at\": \"2024-03-01T09:30:00Z\""));
        assert!(json.contains("\"display_uuid\""));
        assert!(json.contains("\"window_index\": 1"));

        let created = json.find("\"created_at\"").unwrap();
        let displays = json.find("\"displays\"").unwrap();
        let name = json.find("\"name\"").unwrap();
        let version = json.find("\"version\"").unwrap();
        assert!(created < displays && displays < name && name < version);

        let bundle = json.find("\"bundle_id\"").unwrap();
        let frame = json.find("\"frame\"").unwrap();
        let stable = json.find("\"stable_title\"").unwrap();
        let index = json.find("\"window_index\"").unwrap();
        let title = json.find("\"window_title\"").unwrap();
        assert!(bundle < frame && frame < stable && stable < index && index < title);
    }

    #[test]
    fn test_stored_stable_title_is_not_recomputed() {
        let json = r#"{
            "version": 1,
            "name": "Legacy",
            "created_at": "2023-11-14T08:00:00Z",
            "displays": [
                { "display_uuid": "UUID-1",
                  "windows": [
                    { "bundle_id": "com.apple.Terminal",
                      "window_title": "Terminal — bash — 194×53",
                      "stable_title": "Terminal — bash —",
                      "window_index": 0,
                      "frame": { "x": 0, "y": 25, "width": 1440, "height": 875 } }
                  ] }
            ]
        }"#;
        let layout = Layout::from_json(json).unwrap();
        let (_, snap) = layout.windows().next().unwrap();
        assert_eq!(snap.stable_title(), "Terminal — bash —");

        let again = Layout::from_json(&layout.to_json_pretty().unwrap()).unwrap();
        assert_eq!(again, layout);
    }

    #[test]
    fn test_newer_version_is_unsupported() {
        let json = r#"{"version": 2, "name": "Future", "created_at": "2030-01-01T00:00:00Z", "displays": []}"#;
        let layout = Layout::from_json(json).unwrap();
        assert!(!layout.is_supported());
    }
}
