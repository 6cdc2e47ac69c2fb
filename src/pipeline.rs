//! The resumable stage pipeline. Stages run in a fixed order over the item
//! store; each is idempotent by field (a populated output field means the
//! work is done and is never redone), and the store is persisted after every
//! stage so an interrupted run loses at most one stage's work.

use std::path::PathBuf;

use crate::{
    compose::Composer,
    config::DEFAULT_STYLE,
    error::{ReelError, ReelResult},
    generate::{
        GenOutcome, ImageRenderer, SpeechSynthesizer, TextGenerator,
        script::{self, default_image_prompt},
    },
    item::Item,
    media,
    project::ProjectPaths,
    segment,
    slide::{DEFAULT_SLIDE_DURATION, build_slides},
    store::ItemStore,
    template::Template,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageId {
    Script,
    Prompts,
    Images,
    Audio,
    Duration,
    Assembly,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::Script,
        StageId::Prompts,
        StageId::Images,
        StageId::Audio,
        StageId::Duration,
        StageId::Assembly,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageId::Script => "script",
            StageId::Prompts => "prompts",
            StageId::Images => "images",
            StageId::Audio => "audio",
            StageId::Duration => "duration",
            StageId::Assembly => "assembly",
        }
    }
}

/// Script-stage input, present only when a run starts from source text.
#[derive(Clone, Debug)]
pub struct ScriptRequest {
    pub text: String,
    pub segment_count: u32,
    pub style: String,
}

/// Immutable context for one run; stages borrow it and report back instead
/// of touching any ambient state.
pub struct RunContext<'a> {
    pub template: &'a Template,
    pub paths: &'a ProjectPaths,
    pub text_generator: &'a dyn TextGenerator,
    pub image_renderer: &'a dyn ImageRenderer,
    pub speech: &'a dyn SpeechSynthesizer,
    pub script: Option<ScriptRequest>,
    /// Run-input voice; overrides the template's voice roles when present.
    pub voice: Option<String>,
    /// When set, overlong captions are split into bounded chunks after the
    /// script stage; each chunk becomes its own item needing new narration.
    pub max_caption_chars: Option<usize>,
    pub output: PathBuf,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageReport {
    pub completed: usize,
    pub skipped: usize,
    pub warnings: usize,
}

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub stages: Vec<(StageId, StageReport)>,
    pub output: Option<PathBuf>,
}

impl PipelineReport {
    pub fn warnings(&self) -> usize {
        self.stages.iter().map(|(_, r)| r.warnings).sum()
    }
}

pub fn run_pipeline(store: &mut ItemStore, ctx: &RunContext) -> ReelResult<PipelineReport> {
    let mut report = PipelineReport::default();
    for stage in StageId::ALL {
        tracing::info!(stage = stage.name(), "running stage");
        let mut stage_report = run_stage(stage, store, ctx)?;
        if stage == StageId::Script
            && let Some(max_chars) = ctx.max_caption_chars
        {
            let split = segment_pass(store, max_chars);
            stage_report.completed += split.completed;
            stage_report.warnings += split.warnings;
        }
        store.save()?;
        tracing::info!(
            stage = stage.name(),
            completed = stage_report.completed,
            skipped = stage_report.skipped,
            warnings = stage_report.warnings,
            "stage finished"
        );
        report.stages.push((stage, stage_report));
        if stage == StageId::Assembly {
            report.output = Some(ctx.output.clone());
        }
    }
    Ok(report)
}

pub fn run_stage(stage: StageId, store: &mut ItemStore, ctx: &RunContext) -> ReelResult<StageReport> {
    match stage {
        StageId::Script => Ok(script_stage(store, ctx)),
        StageId::Prompts => Ok(prompts_stage(store, ctx)),
        StageId::Images => Ok(images_stage(store, ctx)),
        StageId::Audio => Ok(audio_stage(store, ctx)),
        StageId::Duration => Ok(duration_stage(store)),
        StageId::Assembly => assembly_stage(store, ctx),
    }
}

/// Generate the initial item sequence (one cover plus N content segments).
/// Idempotent over the whole store: existing items mean the script work is
/// already done.
fn script_stage(store: &mut ItemStore, ctx: &RunContext) -> StageReport {
    let mut report = StageReport::default();
    if !store.items.is_empty() {
        tracing::info!(count = store.items.len(), "items already present, script stage skipped");
        report.skipped = store.items.len();
        return report;
    }
    let Some(request) = &ctx.script else {
        tracing::warn!("item store is empty and no source text was provided");
        report.warnings += 1;
        return report;
    };

    match script::generate_cover(ctx.text_generator, &request.text) {
        GenOutcome::Generated(cover) => {
            store.items.push(segment_to_item(cover));
            report.completed += 1;
        }
        GenOutcome::Fallback(cover) => {
            store.items.push(segment_to_item(cover));
            report.completed += 1;
            report.warnings += 1;
        }
        GenOutcome::Failed(cause) => {
            tracing::warn!("cover generation failed: {cause}");
            report.warnings += 1;
        }
    }

    let count = request.segment_count as usize;
    match script::generate_segments(ctx.text_generator, &request.text, count) {
        GenOutcome::Generated(segments) => {
            if segments.len() != count {
                report.warnings += 1;
            }
            report.completed += segments.len();
            store.items.extend(segments.into_iter().map(segment_to_item));
        }
        GenOutcome::Fallback(segments) => {
            report.completed += segments.len();
            report.warnings += 1;
            store.items.extend(segments.into_iter().map(segment_to_item));
        }
        GenOutcome::Failed(cause) => {
            tracing::warn!("script generation failed: {cause}");
            report.warnings += 1;
        }
    }
    report
}

/// Replace every item whose caption exceeds `max_chars` with its split
/// chunks. Items already under the bound pass through untouched, so the pass
/// is a no-op on a resumed store.
fn segment_pass(store: &mut ItemStore, max_chars: usize) -> StageReport {
    let mut report = StageReport::default();
    let mut items = Vec::with_capacity(store.items.len());
    for (i, item) in store.items.iter().enumerate() {
        let chunks = segment::split_item(item, i, max_chars);
        if chunks.len() > 1 {
            tracing::info!(item = i + 1, chunks = chunks.len(), "overlong caption split");
            report.completed += chunks.len();
        } else {
            report.skipped += 1;
        }
        items.extend(chunks);
    }
    store.items = items;
    report
}

fn segment_to_item(segment: script::ScriptSegment) -> Item {
    Item {
        title: Some(segment.title),
        subtitle: Some(segment.subtitle),
        ..Item::default()
    }
}

fn prompts_stage(store: &mut ItemStore, ctx: &RunContext) -> StageReport {
    let mut report = StageReport::default();
    let style = ctx
        .script
        .as_ref()
        .map(|s| s.style.as_str())
        .unwrap_or(DEFAULT_STYLE);

    for (i, item) in store.items.iter_mut().enumerate() {
        if item.has_prompt() {
            tracing::info!(item = i + 1, "prompt already present, skipped");
            report.skipped += 1;
            continue;
        }
        if !item.has_caption_text() {
            tracing::warn!(item = i + 1, "item has no caption text, prompt generation skipped");
            report.warnings += 1;
            continue;
        }

        let Ok(request) = prompt_request(item, ctx.template, style, i + 1) else {
            report.warnings += 1;
            continue;
        };

        match ctx.text_generator.complete(&request) {
            Ok(reply) => {
                item.prompt = Some(reply.trim().to_string());
                report.completed += 1;
            }
            Err(e) => {
                // Degrade to the deterministic local prompt.
                tracing::warn!(item = i + 1, "prompt generation failed: {e}, using default prompt");
                item.prompt = Some(default_image_prompt(
                    item.primary_text().unwrap_or_default(),
                    item.secondary_text().unwrap_or_default(),
                ));
                report.completed += 1;
                report.warnings += 1;
            }
        }
    }
    report
}

fn prompt_request(item: &Item, template: &Template, style: &str, ordinal: usize) -> Result<String, ()> {
    let top_bottom_schema = item.text_top.is_some() || item.text_bottom.is_some();
    if top_bottom_schema && !template.prompt_template.is_empty() {
        let (Some(prompt_top), Some(prompt_bottom)) =
            (item.prompt_top.as_deref(), item.prompt_bottom.as_deref())
        else {
            tracing::warn!(item = ordinal, "item missing PromptTop or PromptBottom, skipped");
            return Err(());
        };
        return Ok(template.fill_prompt(
            item.text_top.as_deref().unwrap_or_default(),
            item.text_bottom.as_deref().unwrap_or_default(),
            prompt_top,
            prompt_bottom,
        ));
    }

    Ok(format!(
        "请为以下视频片段生成一段英文的图片生成提示词，画面风格：{style}。\
         标题：{}。字幕：{}。只返回提示词本身，不要包含其他说明。",
        item.primary_text().unwrap_or_default(),
        item.secondary_text().unwrap_or_default(),
    ))
}

fn images_stage(store: &mut ItemStore, ctx: &RunContext) -> StageReport {
    let mut report = StageReport::default();
    for (i, item) in store.items.iter_mut().enumerate() {
        if item.has_image() {
            tracing::info!(item = i + 1, "image already present, skipped");
            report.skipped += 1;
            continue;
        }
        if !item.has_prompt() {
            tracing::warn!(item = i + 1, "item missing Prompt, image generation skipped");
            report.warnings += 1;
            continue;
        }
        let prompt = item.prompt.as_deref().unwrap_or_default();

        let out_path = ctx.paths.image_path(i);
        match ctx
            .image_renderer
            .render(prompt, ctx.template.video_size, &out_path)
        {
            Ok(path) => {
                item.image = Some(path.to_string_lossy().into_owned());
                report.completed += 1;
            }
            Err(e) => {
                tracing::warn!(item = i + 1, "image generation failed: {e}");
                report.warnings += 1;
            }
        }
    }
    report
}

fn audio_stage(store: &mut ItemStore, ctx: &RunContext) -> StageReport {
    let mut report = StageReport::default();
    for (i, item) in store.items.iter_mut().enumerate() {
        if item.has_audio() {
            tracing::info!(item = i + 1, "audio already present, skipped");
            report.skipped += 1;
            continue;
        }

        let out_path = ctx.paths.audio_path(i);
        match synthesize_item(item, ctx, i, &out_path) {
            Ok(Some(path)) => {
                item.audio = Some(path.to_string_lossy().into_owned());
                report.completed += 1;
            }
            Ok(None) => report.warnings += 1,
            Err(e) => {
                tracing::warn!(item = i + 1, "speech synthesis failed: {e}");
                report.warnings += 1;
            }
        }
    }
    report
}

// Ok(None) means a missing prerequisite was already warned about.
fn synthesize_item(
    item: &Item,
    ctx: &RunContext,
    index: usize,
    out_path: &std::path::Path,
) -> ReelResult<Option<PathBuf>> {
    let template = ctx.template;

    // Two voice roles: narrate both texts and merge in reading order.
    if let (Some(voice_top), Some(voice_bottom)) =
        (template.voice_top.as_deref(), template.voice_bottom.as_deref())
        && ctx.voice.is_none()
        && let (Some(text_top), Some(text_bottom)) =
            (item.text_top.as_deref(), item.text_bottom.as_deref())
    {
        let top_path = out_path.with_extension("top.mp3");
        let bottom_path = out_path.with_extension("bottom.mp3");
        ctx.speech.synthesize(text_top, voice_top, &top_path)?;
        ctx.speech.synthesize(text_bottom, voice_bottom, &bottom_path)?;
        let merged = media::merge_audio_files(&[top_path.clone(), bottom_path.clone()], out_path)?;
        let _ = std::fs::remove_file(&top_path);
        let _ = std::fs::remove_file(&bottom_path);
        return Ok(Some(merged));
    }

    let Some(text) = item.secondary_text() else {
        tracing::warn!(item = index + 1, "item has no narration text, audio skipped");
        return Ok(None);
    };
    let Some(voice) = ctx
        .voice
        .as_deref()
        .or(template.voice_top.as_deref())
        .or(template.voice_bottom.as_deref())
    else {
        tracing::warn!(item = index + 1, "no voice configured, audio skipped");
        return Ok(None);
    };
    ctx.speech.synthesize(text, voice, out_path).map(Some)
}

/// Resolve `duration` for every item that has audio but no recorded value.
/// Unmeasurable audio gets the fixed default so downstream never sees zero.
fn duration_stage(store: &mut ItemStore) -> StageReport {
    let mut report = StageReport::default();
    for (i, item) in store.items.iter_mut().enumerate() {
        if item.has_duration() {
            report.skipped += 1;
            continue;
        }
        let Some(audio) = item.audio.as_deref() else {
            report.skipped += 1;
            continue;
        };

        let measured = media::probe_audio_duration(audio.as_ref());
        if measured > 0.0 {
            tracing::info!(item = i + 1, duration = measured, "audio duration measured");
            item.duration = Some(measured);
        } else {
            tracing::info!(item = i + 1, "audio duration unmeasurable, using default");
            item.duration = Some(DEFAULT_SLIDE_DURATION);
        }
        report.completed += 1;
    }
    report
}

/// Build slides and encode the final video. The only stage whose failure is
/// fatal for the run; everything persisted upstream survives for a resume.
fn assembly_stage(store: &mut ItemStore, ctx: &RunContext) -> ReelResult<StageReport> {
    let mut report = StageReport::default();
    let build = build_slides(&store.items);
    report.warnings += build.skipped;
    if build.slides.is_empty() {
        return Err(ReelError::compose("no valid slides to assemble"));
    }

    let mut composer = Composer::from_template(ctx.template)?;
    composer.create_video(&build.slides, &ctx.paths.root, &ctx.output)?;
    report.completed = build.slides.len();
    Ok(report)
}
