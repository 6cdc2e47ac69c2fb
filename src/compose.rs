//! Slide composition and final assembly: cover-crop the image to the target
//! frame, burn in caption layers, attach per-slide narration, concatenate
//! hard-cut clips, and encode one MP4 via the system ffmpeg.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use image::{RgbaImage, imageops};

use crate::{
    error::{ReelError, ReelResult},
    media,
    slide::Slide,
    template::Template,
    text::{CaptionPainter, CaptionStyle, parse_hex_color},
};

/// Left/right margin reserved around caption text.
const TEXT_MARGIN_X: u32 = 50;
/// Top anchor for the primary caption and bottom anchor distance for the
/// secondary caption.
const TOP_MARGIN: u32 = 30;
const BOTTOM_MARGIN: u32 = 30;

/// Scale factor that makes the image fully cover the target frame on both
/// axes (never the smaller ratio, which would letterbox).
pub fn cover_scale(img_w: u32, img_h: u32, target_w: u32, target_h: u32) -> f64 {
    let scale_w = f64::from(target_w) / f64::from(img_w);
    let scale_h = f64::from(target_h) / f64::from(img_h);
    scale_w.max(scale_h)
}

/// Symmetric center-crop rectangle `(x, y, w, h)` in source coordinates: the
/// largest centered region whose aspect ratio matches the target frame. Both
/// axes stay within the source, so downstream never allocates more than the
/// source plus the target.
pub fn cover_crop_rect(img_w: u32, img_h: u32, target_w: u32, target_h: u32) -> (u32, u32, u32, u32) {
    let scale = cover_scale(img_w, img_h, target_w, target_h);
    let w = ((f64::from(target_w) / scale).round() as u32).clamp(1, img_w);
    let h = ((f64::from(target_h) / scale).round() as u32).clamp(1, img_h);
    ((img_w - w) / 2, (img_h - h) / 2, w, h)
}

/// Center-crop to the covering region, then resize that region to exactly
/// `target_w` x `target_h`; no blank border, whatever the input aspect ratio.
pub fn cover_crop(img: &RgbaImage, target_w: u32, target_h: u32) -> RgbaImage {
    let (x, y, w, h) = cover_crop_rect(img.width(), img.height(), target_w, target_h);
    let region = imageops::crop_imm(img, x, y, w, h).to_image();
    if (region.width(), region.height()) == (target_w, target_h) {
        return region;
    }
    imageops::resize(&region, target_w, target_h, imageops::FilterType::Triangle)
}

pub struct Composer {
    painter: CaptionPainter,
    video_size: [u32; 2],
    fps: u32,
    font_size: u32,
    text_color: [u8; 4],
    text_bottom_color: [u8; 4],
    title_color: [u8; 4],
    stroke_color: [u8; 4],
    stroke_width: u32,
    caption_plate: bool,
}

impl Composer {
    pub fn from_template(template: &Template) -> ReelResult<Self> {
        let [w, h] = template.video_size;
        if w == 0 || h == 0 {
            return Err(ReelError::compose("video width/height must be non-zero"));
        }
        if !w.is_multiple_of(2) || !h.is_multiple_of(2) {
            // yuv420p output requires even dimensions.
            return Err(ReelError::compose(
                "video width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if template.fps == 0 {
            return Err(ReelError::compose("fps must be non-zero"));
        }

        Ok(Self {
            painter: CaptionPainter::load(template.font.as_ref())?,
            video_size: template.video_size,
            fps: template.fps,
            font_size: template.font_size,
            text_color: parse_hex_color(&template.text_color)?,
            text_bottom_color: parse_hex_color(&template.text_bottom_color)?,
            title_color: parse_hex_color(&template.title_color)?,
            stroke_color: parse_hex_color(&template.stroke_color)?,
            stroke_width: template.stroke_width,
            caption_plate: template.caption_plate,
        })
    }

    /// One composite frame for a slide: cover-cropped image beneath the top
    /// and bottom caption layers. `is_cover` renders the primary caption in
    /// the title color at a larger size.
    pub fn compose_frame(&mut self, slide: &Slide, is_cover: bool) -> ReelResult<RgbaImage> {
        let [target_w, target_h] = self.video_size;
        let img = image::open(&slide.image)
            .map_err(|e| {
                ReelError::compose(format!(
                    "cannot load image '{}': {e}",
                    slide.image.display()
                ))
            })?
            .to_rgba8();

        let mut frame = cover_crop(&img, target_w, target_h);
        debug_assert_eq!((frame.width(), frame.height()), (target_w, target_h));

        let wrap_width = target_w.saturating_sub(2 * TEXT_MARGIN_X);

        if let Some(title) = slide.title.as_deref() {
            // The cover title reads a third larger than body captions.
            let font_size = if is_cover {
                (self.font_size * 4 / 3) as f32
            } else {
                self.font_size as f32
            };
            let style = CaptionStyle {
                font_size,
                color: if is_cover {
                    self.title_color
                } else {
                    self.text_color
                },
                stroke_color: self.stroke_color,
                stroke_width: self.stroke_width,
                plate: self.caption_plate,
            };
            let lines = self.painter.wrap(title, style.font_size, wrap_width);
            self.painter.paint(&mut frame, &lines, &style, TOP_MARGIN);
        }

        if let Some(subtitle) = slide.subtitle.as_deref() {
            let style = CaptionStyle {
                font_size: self.font_size as f32,
                color: self.text_bottom_color,
                stroke_color: self.stroke_color,
                stroke_width: self.stroke_width,
                plate: self.caption_plate,
            };
            let lines = self.painter.wrap(subtitle, style.font_size, wrap_width);
            // Anchored above the bottom margin by the block's own height so
            // it never runs off-frame.
            let block_h = self.painter.painted_height(&lines, &style);
            let top_y = target_h.saturating_sub(BOTTOM_MARGIN + block_h);
            self.painter.paint(&mut frame, &lines, &style, top_y);
        }

        Ok(frame)
    }

    /// Assemble slides into `output`. Per-slide intermediates live under
    /// `<work_dir>/slides/` and are removed once encoding finishes, on the
    /// failure path too.
    pub fn create_video(
        &mut self,
        slides: &[Slide],
        work_dir: &Path,
        output: &Path,
    ) -> ReelResult<()> {
        if slides.is_empty() {
            return Err(ReelError::compose("no slides to assemble"));
        }
        if !media::is_ffmpeg_on_path() {
            return Err(ReelError::compose(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }
        media::ensure_parent_dir(output)?;

        let slides_dir = work_dir.join("slides");
        std::fs::create_dir_all(&slides_dir).map_err(|e| {
            ReelError::compose(format!(
                "failed to create '{}': {e}",
                slides_dir.display()
            ))
        })?;

        let result = self.render_and_concat(slides, &slides_dir, output);
        let _ = std::fs::remove_dir_all(&slides_dir);
        result
    }

    fn render_and_concat(
        &mut self,
        slides: &[Slide],
        slides_dir: &Path,
        output: &Path,
    ) -> ReelResult<()> {
        let mut clips = Vec::with_capacity(slides.len());
        for (i, slide) in slides.iter().enumerate() {
            tracing::info!(slide = i + 1, total = slides.len(), "composing slide");
            let frame = self.compose_frame(slide, i == 0)?;

            let frame_path = slides_dir.join(format!("slide_{:04}.png", i + 1));
            frame.save(&frame_path).map_err(|e| {
                ReelError::compose(format!(
                    "failed to write frame '{}': {e}",
                    frame_path.display()
                ))
            })?;

            let clip_path = slides_dir.join(format!("slide_{:04}.mp4", i + 1));
            self.encode_clip(&frame_path, &slide.audio, slide.duration, &clip_path)?;
            clips.push(clip_path);
        }

        tracing::info!(output = %output.display(), "concatenating final video");
        self.concat_clips(&clips, slides_dir, output)
    }

    // Still image + narration -> one clip, visual duration clamped to the
    // resolved slide duration.
    fn encode_clip(
        &self,
        frame: &Path,
        audio: &Path,
        duration: f64,
        out_path: &Path,
    ) -> ReelResult<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-y", "-loop", "1"])
            .args(["-framerate", &self.fps.to_string()])
            .arg("-i")
            .arg(frame)
            .arg("-i")
            .arg(audio)
            .args(["-t", &format!("{duration:.3}")])
            .args([
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-ar",
                "44100",
            ])
            .arg(out_path);

        run_ffmpeg(cmd, "slide clip encode")
    }

    fn concat_clips(&self, clips: &[PathBuf], slides_dir: &Path, output: &Path) -> ReelResult<()> {
        let list_path = slides_dir.join("concat.txt");
        let mut list = String::new();
        for clip in clips {
            let abs = std::fs::canonicalize(clip).map_err(|e| {
                ReelError::compose(format!("clip '{}' unreadable: {e}", clip.display()))
            })?;
            list.push_str(&format!("file '{}'\n", abs.display()));
        }
        std::fs::write(&list_path, list)
            .map_err(|e| ReelError::compose(format!("failed to write concat list: {e}")))?;

        // Hard cuts only; clips share codec parameters so streams are copied.
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(["-c", "copy", "-movflags", "+faststart"])
            .arg(output);

        run_ffmpeg(cmd, "final concat encode")
    }
}

fn run_ffmpeg(mut cmd: Command, what: &str) -> ReelResult<()> {
    let out = cmd
        .output()
        .map_err(|e| ReelError::compose(format!("failed to run ffmpeg for {what}: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::compose(format!(
            "{what} failed with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}
