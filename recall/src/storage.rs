use std::io::Write;
use std::path::{Path, PathBuf};

use recall_layout::{Layout, CURRENT_VERSION};
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("layout name must not be empty")]
    InvalidName,

    #[error("no layout named '{name}'")]
    NotFound { name: String },

    #[error("'{name}' maps to the same file as existing layout '{existing}'")]
    KeyCollision { name: String, existing: String },

    #[error("layout '{name}' uses format version {version}, newer than supported {max}", max = CURRENT_VERSION)]
    UnsupportedVersion { name: String, version: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// File name a layout is stored under. Path separators become `-`.
pub fn name_to_key(name: &str) -> String {
    format!("{}.json", name.replace(['/', ':'], "-"))
}

/// One JSON file per layout in a single directory.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    dir: PathBuf,
}

impl LayoutStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name_to_key(name))
    }

    pub fn locate(&self, layout: &Layout) -> PathBuf {
        self.path_for(layout.name())
    }

    /// True when a file for `name` exists and does not belong to a different layout.
    pub fn exists(&self, name: &str) -> bool {
        let path = self.path_for(name);
        if !path.exists() {
            return false;
        }
        match read_layout(&path) {
            Ok(stored) => stored.name() == name,
            // Unreadable files still occupy the key; saving would replace them.
            Err(_) => true,
        }
    }

    /// Write `layout`, replacing any earlier layout with the same name.
    pub fn save(&self, layout: &Layout) -> Result<PathBuf, StorageError> {
        let name = layout.name();
        if name.trim().is_empty() {
            return Err(StorageError::InvalidName);
        }

        let path = self.locate(layout);
        if path.exists() {
            if let Ok(stored) = read_layout(&path) {
                if stored.name() != name {
                    return Err(StorageError::KeyCollision {
                        name: name.to_string(),
                        existing: stored.name().to_string(),
                    });
                }
            }
        }

        let json = layout.to_json_pretty()?;
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::info!(
            "Saved layout '{}' ({} windows) to {}",
            name,
            layout.window_count(),
            path.display()
        );
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Layout, StorageError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(StorageError::NotFound {
                name: name.to_string(),
            });
        }

        let layout = read_layout(&path)?;
        if layout.name() != name {
            return Err(StorageError::NotFound {
                name: name.to_string(),
            });
        }
        if !layout.is_supported() {
            return Err(StorageError::UnsupportedVersion {
                name: name.to_string(),
                version: layout.version(),
            });
        }
        Ok(layout)
    }

    /// Every readable layout, sorted by name ignoring case.
    pub fn load_all(&self) -> Vec<Layout> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read layouts directory {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut layouts = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_layout(&path) {
                Ok(layout) if layout.is_supported() => layouts.push(layout),
                Ok(layout) => tracing::warn!(
                    "Skipping {}: format version {} is newer than {}",
                    path.display(),
                    layout.version(),
                    CURRENT_VERSION
                ),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        layouts.sort_by_key(|l| l.name().to_lowercase());
        layouts
    }

    pub fn delete(&self, layout: &Layout) -> Result<(), StorageError> {
        self.delete_named(layout.name())
    }

    pub fn delete_named(&self, name: &str) -> Result<(), StorageError> {
        if !self.exists(name) {
            return Err(StorageError::NotFound {
                name: name.to_string(),
            });
        }
        let path = self.path_for(name);
        std::fs::remove_file(&path)?;
        tracing::info!("Deleted layout '{}' ({})", name, path.display());
        Ok(())
    }
}

fn read_layout(path: &Path) -> Result<Layout, StorageError> {
    let json = std::fs::read_to_string(path)?;
    Ok(Layout::from_json(&json)?)
}
