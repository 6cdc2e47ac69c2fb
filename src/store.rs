//! Persisted item sequence. Two on-disk shapes are accepted: a bare JSON
//! array of items, or an object wrapping the array with a template name.
//! Saving always writes back the shape that was loaded.

use std::path::{Path, PathBuf};

use crate::{
    error::{ReelError, ReelResult},
    item::Item,
};

fn default_template_name() -> String {
    "default".to_string()
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum ItemFile {
    Wrapped {
        #[serde(default = "default_template_name")]
        template: String,
        items: Vec<Item>,
    },
    Bare(Vec<Item>),
}

/// Sole owner of the item sequence for a run. Stages borrow `items` mutably
/// and the pipeline persists after each stage via [`ItemStore::save`].
#[derive(Clone, Debug)]
pub struct ItemStore {
    path: PathBuf,
    template: Option<String>,
    pub items: Vec<Item>,
}

impl ItemStore {
    /// A fresh bare-array store at `path` with no items yet.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            template: None,
            items: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> ReelResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReelError::store(format!("failed to read '{}': {e}", path.display()))
        })?;
        let file: ItemFile = serde_json::from_str(&raw).map_err(|e| {
            ReelError::store(format!("failed to parse '{}': {e}", path.display()))
        })?;
        let (template, items) = match file {
            ItemFile::Wrapped { template, items } => (Some(template), items),
            ItemFile::Bare(items) => (None, items),
        };
        tracing::info!(path = %path.display(), count = items.len(), "loaded item file");
        Ok(Self {
            path: path.to_path_buf(),
            template,
            items,
        })
    }

    pub fn save(&self) -> ReelResult<()> {
        let file = match &self.template {
            Some(template) => ItemFile::Wrapped {
                template: template.clone(),
                items: self.items.clone(),
            },
            None => ItemFile::Bare(self.items.clone()),
        };
        let raw = serde_json::to_string_pretty(&file)
            .map_err(|e| ReelError::store(format!("failed to serialize items: {e}")))?;
        std::fs::write(&self.path, raw).map_err(|e| {
            ReelError::store(format!("failed to write '{}': {e}", self.path.display()))
        })?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Template name supplying rendering/voice parameters; bare-array stores
    /// fall back to the canonical default.
    pub fn template_name(&self) -> &str {
        self.template.as_deref().unwrap_or("default")
    }
}
