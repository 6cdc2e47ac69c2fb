//! Named template bundles: static rendering and voice parameters for a run.
//! Templates are JSON files in a fixed directory, keyed by file stem. An
//! unknown or unparsable name falls back to `default`; a missing `default`
//! is fatal.

use std::path::Path;

use crate::error::{ReelError, ReelResult};

pub const DEFAULT_TEMPLATE: &str = "default";

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Template {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_video_size")]
    pub video_size: [u32; 2],
    #[serde(default = "default_fps")]
    pub fps: u32,
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_text_bottom_color")]
    pub text_bottom_color: String,
    #[serde(default = "default_title_color")]
    pub title_color: String,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,
    /// Voice for the single-narration case and for the top text role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_top: Option<String>,
    /// Second voice role; when both roles are set and an item carries both
    /// texts, the audio stage synthesizes each and merges them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_bottom: Option<String>,
    /// Prompt-construction template with `{text_top}`, `{text_bottom}`,
    /// `{prompt_top}`, `{prompt_bottom}` placeholders.
    #[serde(default)]
    pub prompt_template: String,
    /// Render a semi-transparent plate behind each caption layer.
    #[serde(default = "default_true")]
    pub caption_plate: bool,
}

fn default_name() -> String {
    DEFAULT_TEMPLATE.to_string()
}
fn default_video_size() -> [u32; 2] {
    [1080, 1920]
}
fn default_fps() -> u32 {
    18
}
fn default_font_size() -> u32 {
    60
}
fn default_text_color() -> String {
    "#2C3E50".to_string()
}
fn default_text_bottom_color() -> String {
    "#34495E".to_string()
}
fn default_title_color() -> String {
    "#E74C3C".to_string()
}
fn default_stroke_color() -> String {
    "#FFFFFF".to_string()
}
fn default_stroke_width() -> u32 {
    2
}
fn default_true() -> bool {
    true
}

impl Template {
    /// Fill the prompt template with an item's text and role fields.
    pub fn fill_prompt(
        &self,
        text_top: &str,
        text_bottom: &str,
        prompt_top: &str,
        prompt_bottom: &str,
    ) -> String {
        self.prompt_template
            .replace("{text_top}", text_top)
            .replace("{text_bottom}", text_bottom)
            .replace("{prompt_top}", prompt_top)
            .replace("{prompt_bottom}", prompt_bottom)
    }
}

pub fn load_template(dir: &Path, name: &str) -> ReelResult<Template> {
    let path = dir.join(format!("{name}.json"));
    let fall_back = |why: String| -> ReelResult<Template> {
        if name != DEFAULT_TEMPLATE {
            tracing::warn!(template = name, "{why}, falling back to default template");
            load_template(dir, DEFAULT_TEMPLATE)
        } else {
            Err(ReelError::template(format!(
                "default template '{}' unavailable: {why}",
                path.display()
            )))
        }
    };

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => return fall_back(format!("cannot read '{}': {e}", path.display())),
    };
    match serde_json::from_str::<Template>(&raw) {
        Ok(template) => Ok(template),
        Err(e) => fall_back(format!("cannot parse '{}': {e}", path.display())),
    }
}

/// Available template names (file stems of `*.json` in the templates dir).
pub fn list_templates(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let path = e.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                path.file_stem().map(|s| s.to_string_lossy().into_owned())
            } else {
                None
            }
        })
        .collect();
    names.sort();
    names
}
