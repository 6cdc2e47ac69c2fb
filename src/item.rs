//! The unit of pipeline state: one narrative segment and the artifacts each
//! stage has produced for it so far. A field being present (and non-empty) is
//! the completion signal for the stage that owns it; stages never overwrite a
//! populated field.

fn is_set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// One narrative segment. Two caption schemas exist and are never mixed in a
/// single run: `title`/`subtitle` (script-generated projects) and
/// `TextTop`/`TextBottom` (template-driven item files, optionally carrying
/// per-role prompt descriptions).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(rename = "TextTop", default, skip_serializing_if = "Option::is_none")]
    pub text_top: Option<String>,
    #[serde(
        rename = "TextBottom",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub text_bottom: Option<String>,
    #[serde(rename = "PromptTop", default, skip_serializing_if = "Option::is_none")]
    pub prompt_top: Option<String>,
    #[serde(
        rename = "PromptBottom",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_bottom: Option<String>,

    /// Image-generation instruction text, produced by the prompt stage.
    #[serde(rename = "Prompt", default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Path to the rendered raster asset, produced by the image stage.
    #[serde(rename = "Image", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Path to the rendered narration asset, produced by the audio stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    /// Playback seconds, produced by the duration stage. Always > 0 once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Provenance marker for items produced by caption segmentation:
    /// `source_index * 100 + sub_index`. Absent on unsplit items.
    #[serde(
        rename = "_split_index",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub split_index: Option<u32>,
}

impl Item {
    /// Caption anchored near the top of the frame (`title` or `TextTop`).
    pub fn primary_text(&self) -> Option<&str> {
        if is_set(&self.title) {
            self.title.as_deref()
        } else if is_set(&self.text_top) {
            self.text_top.as_deref()
        } else {
            None
        }
    }

    /// Caption anchored near the bottom of the frame (`subtitle` or
    /// `TextBottom`). Also the narration text for single-voice synthesis.
    pub fn secondary_text(&self) -> Option<&str> {
        if is_set(&self.subtitle) {
            self.subtitle.as_deref()
        } else if is_set(&self.text_bottom) {
            self.text_bottom.as_deref()
        } else {
            None
        }
    }

    /// An item with neither schema populated is invalid and must be skipped
    /// with a warning by every stage that needs caption text.
    pub fn has_caption_text(&self) -> bool {
        self.primary_text().is_some() || self.secondary_text().is_some()
    }

    pub fn has_prompt(&self) -> bool {
        is_set(&self.prompt)
    }

    pub fn has_image(&self) -> bool {
        is_set(&self.image)
    }

    pub fn has_audio(&self) -> bool {
        is_set(&self.audio)
    }

    pub fn has_duration(&self) -> bool {
        self.duration.is_some_and(|d| d > 0.0)
    }
}
