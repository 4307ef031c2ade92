use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use recall_layout::Layout;

use crate::core::{capture_layout, CaptureError, Config, RestoreOutcome, RestoreSummary, Restorer};
use crate::platform::WindowManipulator;
use crate::storage::LayoutStore;

const PERMISSION_HINT: &str = "Please grant Recall Accessibility permission in \
     System Settings > Privacy & Security > Accessibility.";

/// User-facing report for a finished restore. `None` when everything came back.
pub fn restore_message(summary: &RestoreSummary) -> Option<String> {
    match summary.outcome() {
        RestoreOutcome::PermissionLikely => Some(format!(
            "No windows were restored. Recall needs Accessibility permission. {}",
            PERMISSION_HINT
        )),
        RestoreOutcome::Partial => Some(format!(
            "Restored {} of {} windows. Some windows could not be restored.",
            summary.restored, summary.total
        )),
        RestoreOutcome::Complete => None,
    }
}

pub struct App<P> {
    platform: Arc<P>,
    store: LayoutStore,
    restorer: Restorer<P>,
}

impl<P> App<P>
where
    P: WindowManipulator + Send + Sync + 'static,
{
    pub fn new(platform: Arc<P>, config: &Config) -> Result<Self> {
        let store = LayoutStore::open(&config.layouts_dir).with_context(|| {
            format!(
                "Failed to open layouts directory {}",
                config.layouts_dir.display()
            )
        })?;
        let restorer = Restorer::new(Arc::clone(&platform), config.timing);
        Ok(Self {
            platform,
            store,
            restorer,
        })
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    /// Capture the current windows under `name`. An existing layout with the
    /// same name is only replaced when `force` is set.
    pub fn save(&self, name: &str, force: bool) -> Result<Layout> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Layout name must not be empty");
        }
        if self.store.exists(name) && !force {
            bail!(
                "Layout '{}' already exists. Use --force to overwrite it.",
                name
            );
        }

        let layout = match capture_layout(name, self.platform.as_ref()) {
            Ok(layout) => layout,
            Err(e @ CaptureError::NoWindowsCaptured { .. }) => {
                self.platform.request_accessibility_permission();
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to capture window layout. {}", PERMISSION_HINT)));
            }
            Err(e) => return Err(e.into()),
        };

        self.store
            .save(&layout)
            .with_context(|| format!("Failed to save layout '{}'", name))?;
        Ok(layout)
    }

    pub async fn restore(&self, name: &str) -> Result<RestoreSummary> {
        let layout = self
            .store
            .load(name)
            .with_context(|| format!("Failed to load layout '{}'", name))?;
        let summary = self
            .restorer
            .spawn(layout)
            .await
            .context("Restore task failed")?;
        Ok(summary)
    }

    pub fn list(&self) -> Vec<Layout> {
        self.store.load_all()
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.store
            .delete_named(name)
            .with_context(|| format!("Failed to delete layout '{}'", name))
    }

    /// File backing `name`, which must exist.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        if !self.store.exists(name) {
            bail!("No layout named '{}'", name);
        }
        Ok(self.store.path_for(name))
    }
}
