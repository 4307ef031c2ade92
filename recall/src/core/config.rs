use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const LAYOUTS_DIR_ENV: &str = "RECALL_LAYOUTS_DIR";

/// Pauses inserted after OS state changes that have no completion signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestoreTiming {
    /// Upper bound on waiting for the OS to acknowledge a launch request.
    pub launch_timeout: Duration,
    pub launch_settle: Duration,
    pub activate_settle: Duration,
    pub new_window_settle: Duration,
    /// Wait before re-reading a frame we just applied.
    pub frame_settle: Duration,
}

impl Default for RestoreTiming {
    fn default() -> Self {
        Self {
            launch_timeout: Duration::from_secs(10),
            launch_settle: Duration::from_millis(500),
            activate_settle: Duration::from_millis(500),
            new_window_settle: Duration::from_millis(500),
            frame_settle: Duration::from_millis(100),
        }
    }
}

impl RestoreTiming {
    /// No settle delays. For tests and mock platforms.
    pub fn immediate() -> Self {
        Self {
            launch_timeout: Duration::from_secs(1),
            launch_settle: Duration::ZERO,
            activate_settle: Duration::ZERO,
            new_window_settle: Duration::ZERO,
            frame_settle: Duration::ZERO,
        }
    }
}

/// Application configuration settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub layouts_dir: PathBuf,
    pub timing: RestoreTiming,
}

impl Config {
    /// Resolve configuration: explicit override, then `RECALL_LAYOUTS_DIR`, then the
    /// per-user data directory (`~/Library/Application Support/Recall/layouts` on macOS).
    pub fn load(layouts_dir_override: Option<PathBuf>) -> Result<Self> {
        let layouts_dir = match layouts_dir_override {
            Some(dir) => dir,
            None => default_layouts_dir()?,
        };
        tracing::debug!("Layouts directory: {:?}", layouts_dir);
        Ok(Self {
            layouts_dir,
            timing: RestoreTiming::default(),
        })
    }
}

fn default_layouts_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(LAYOUTS_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir().context("Could not determine the user data directory")?;
    Ok(data_dir.join("Recall").join("layouts"))
}
