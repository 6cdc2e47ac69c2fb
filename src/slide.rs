//! Projection of fully-populated items into renderable slides. A slide always
//! carries a strictly positive duration; zero-duration visual segments are
//! undefined downstream.

use std::path::PathBuf;

use crate::{item::Item, media};

/// Fixed fallback when an audio asset reports no measurable duration.
pub const DEFAULT_SLIDE_DURATION: f64 = 3.0;

#[derive(Clone, Debug)]
pub struct Slide {
    pub image: PathBuf,
    pub audio: PathBuf,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub duration: f64,
}

#[derive(Clone, Debug, Default)]
pub struct SlideBuild {
    pub slides: Vec<Slide>,
    /// Items excluded for missing image or audio; each exclusion is warned.
    pub skipped: usize,
}

/// Recorded nonzero duration wins; otherwise the audio asset is measured;
/// an unmeasurable asset gets the fixed default.
pub fn resolve_duration(item: &Item) -> f64 {
    if let Some(d) = item.duration
        && d > 0.0
    {
        return d;
    }
    if let Some(audio) = item.audio.as_deref() {
        let measured = media::probe_audio_duration(audio.as_ref());
        if measured > 0.0 {
            return measured;
        }
    }
    DEFAULT_SLIDE_DURATION
}

pub fn build_slides(items: &[Item]) -> SlideBuild {
    let mut build = SlideBuild::default();
    for (i, item) in items.iter().enumerate() {
        if !item.has_image() || !item.has_audio() {
            tracing::warn!(item = i + 1, "item missing Image or audio, excluded from slides");
            build.skipped += 1;
            continue;
        }

        let duration = resolve_duration(item);
        tracing::info!(slide = build.slides.len() + 1, duration, "slide ready");
        build.slides.push(Slide {
            image: PathBuf::from(item.image.as_deref().unwrap_or_default()),
            audio: PathBuf::from(item.audio.as_deref().unwrap_or_default()),
            title: item.primary_text().map(str::to_string),
            subtitle: item.secondary_text().map(str::to_string),
            duration,
        });
    }
    build
}
