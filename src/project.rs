//! Deterministic per-project filesystem layout and output naming.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Local};

use crate::error::ReelResult;

pub const DEFAULT_BASE_DIR: &str = "temp";

/// Working directory for one project: `<base>/<name>/` with `images/` and
/// `audio/` for generated assets; the item file and the output video live in
/// the root.
#[derive(Clone, Debug)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub item_file: PathBuf,
}

impl ProjectPaths {
    pub fn create(base_dir: &Path, name: &str) -> ReelResult<Self> {
        let root = base_dir.join(name);
        let images_dir = root.join("images");
        let audio_dir = root.join("audio");
        for dir in [&root, &images_dir, &audio_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create '{}'", dir.display()))?;
        }
        tracing::info!(root = %root.display(), "project directory ready");
        Ok(Self {
            item_file: root.join(format!("{name}.json")),
            root,
            images_dir,
            audio_dir,
        })
    }

    /// Layout for an existing item file: assets live next to it.
    pub fn for_item_file(item_file: &Path) -> Self {
        let root = item_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            images_dir: root.join("images"),
            audio_dir: root.join("audio"),
            item_file: item_file.to_path_buf(),
            root,
        }
    }

    pub fn image_path(&self, index: usize) -> PathBuf {
        self.images_dir.join(format!("image_{}.jpg", index + 1))
    }

    pub fn audio_path(&self, index: usize) -> PathBuf {
        self.audio_dir.join(format!("audio_{}.mp3", index + 1))
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.root.join(output_filename(name, Local::now()))
    }
}

pub fn output_filename(name: &str, at: DateTime<Local>) -> String {
    format!("{name}_{}.mp4", at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn create_lays_out_asset_directories() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::create(dir.path(), "demo").unwrap();
        assert!(paths.images_dir.is_dir());
        assert!(paths.audio_dir.is_dir());
        assert_eq!(paths.item_file, dir.path().join("demo").join("demo.json"));
        assert_eq!(paths.image_path(0), paths.images_dir.join("image_1.jpg"));
        assert_eq!(paths.audio_path(2), paths.audio_dir.join("audio_3.mp3"));
    }

    #[test]
    fn output_name_embeds_project_and_timestamp() {
        let at = Local.with_ymd_and_hms(2026, 8, 30, 14, 5, 9).unwrap();
        assert_eq!(output_filename("demo", at), "demo_20260830_140509.mp4");
    }

    #[test]
    fn item_file_layout_derives_sibling_asset_dirs() {
        let paths = ProjectPaths::for_item_file(Path::new("temp/story/story.json"));
        assert_eq!(paths.images_dir, Path::new("temp/story/images"));
        assert_eq!(paths.audio_dir, Path::new("temp/story/audio"));
    }
}
