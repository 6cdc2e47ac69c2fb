//! Run input and service credentials. Both are fatal at startup when
//! incomplete; nothing downstream runs with a partial configuration.

use std::path::Path;

use crate::error::{ReelError, ReelResult};

pub const DEFAULT_STYLE: &str = "插画";

/// Immutable per-run context built once from the run-input file.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub text: String,
    /// Number of content segments to generate (the cover is extra).
    pub images: u32,
    pub video_size: [u32; 2],
    pub voice: String,
    pub font: String,
    pub font_size: u32,
    pub font_color: String,
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

// Raw shape with everything optional, so one pass can report every missing
// key instead of failing on the first.
#[derive(serde::Deserialize)]
struct RawRunConfig {
    name: Option<String>,
    text: Option<String>,
    images: Option<u32>,
    // Long-standing misspelling accepted as a synonym in existing input files.
    iamges: Option<u32>,
    video_size: Option<[u32; 2]>,
    voice: Option<String>,
    font: Option<String>,
    font_size: Option<u32>,
    font_color: Option<String>,
    style: Option<String>,
}

impl RunConfig {
    pub fn load(path: &Path) -> ReelResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReelError::config(format!("failed to read input '{}': {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> ReelResult<Self> {
        let raw: RawRunConfig = serde_json::from_str(raw)
            .map_err(|e| ReelError::config(format!("input file is not a valid object: {e}")))?;

        let images = raw.images.or(raw.iamges);

        let mut missing = Vec::new();
        if raw.name.is_none() {
            missing.push("name");
        }
        if raw.text.is_none() {
            missing.push("text");
        }
        if images.is_none() {
            missing.push("images");
        }
        if raw.video_size.is_none() {
            missing.push("video_size");
        }
        if raw.voice.is_none() {
            missing.push("voice");
        }
        if raw.font.is_none() {
            missing.push("font");
        }
        if raw.font_size.is_none() {
            missing.push("font_size");
        }
        if raw.font_color.is_none() {
            missing.push("font_color");
        }
        if !missing.is_empty() {
            return Err(ReelError::config(format!(
                "input file is missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            name: raw.name.unwrap_or_default(),
            text: raw.text.unwrap_or_default(),
            images: images.unwrap_or_default(),
            video_size: raw.video_size.unwrap_or_default(),
            voice: raw.voice.unwrap_or_default(),
            font: raw.font.unwrap_or_default(),
            font_size: raw.font_size.unwrap_or_default(),
            font_color: raw.font_color.unwrap_or_default(),
            style: raw.style.unwrap_or_else(default_style),
        })
    }
}

/// API credentials for the generation collaborators, read from the
/// environment (the CLI loads `.env` first).
#[derive(Clone, Debug)]
pub struct Credentials {
    pub deepseek_api_key: String,
    pub deepseek_base_url: String,
    pub ark_api_key: String,
    pub dashscope_api_key: String,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            deepseek_api_key: std::env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
            deepseek_base_url: std::env::var("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com".to_string()),
            ark_api_key: std::env::var("ARK_API_KEY").unwrap_or_default(),
            dashscope_api_key: std::env::var("DASHSCOPE_API_KEY").unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> ReelResult<()> {
        let mut missing = Vec::new();
        if self.deepseek_api_key.is_empty() {
            missing.push("DEEPSEEK_API_KEY");
        }
        if self.ark_api_key.is_empty() {
            missing.push("ARK_API_KEY");
        }
        if self.dashscope_api_key.is_empty() {
            missing.push("DASHSCOPE_API_KEY");
        }
        if !missing.is_empty() {
            return Err(ReelError::config(format!(
                "missing required credentials: {} (set them in the environment or .env)",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}
