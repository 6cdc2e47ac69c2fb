//! End-to-end pipeline behavior over a real item file on disk, with counting
//! collaborators standing in for the network services. The core property:
//! a second run performs zero external calls for work already recorded.

use std::{
    cell::Cell,
    path::{Path, PathBuf},
};

use storyreel::{
    error::{ReelError, ReelResult},
    generate::{ImageRenderer, SpeechSynthesizer, TextGenerator},
    item::Item,
    pipeline::{RunContext, ScriptRequest, StageId, run_stage},
    project::ProjectPaths,
    store::ItemStore,
    template::Template,
};

const SOURCE_TEXT: &str = "从前有一座山，山里有一座庙。庙里有一位老和尚，每天给小和尚讲故事。\
    故事讲的是从前有一座山，山里有一座庙。小和尚听着听着就睡着了，梦里也有一座山。\
    第二天醒来，他决定自己下山去看看，山外的世界究竟是什么样子。";

struct CountingText {
    calls: Cell<usize>,
}

impl CountingText {
    fn new() -> Self {
        Self { calls: Cell::new(0) }
    }
}

impl TextGenerator for CountingText {
    fn complete(&self, prompt: &str) -> ReelResult<String> {
        self.calls.set(self.calls.get() + 1);
        if prompt.contains("封面") {
            Ok(r#"{"title":"山中故事","subtitle":"一个关于山、庙和小和尚的故事，看到最后有惊喜"}"#.to_string())
        } else if prompt.contains("JSON数组") {
            Ok(r#"[
                {"title":"进山","subtitle":"从前有一座山，山里有一座庙"},
                {"title":"听故事","subtitle":"老和尚每天给小和尚讲故事"},
                {"title":"下山","subtitle":"小和尚决定自己去看山外的世界"}
            ]"#
            .to_string())
        } else {
            Ok("warm storybook illustration of a mountain temple".to_string())
        }
    }
}

struct CountingImage {
    calls: Cell<usize>,
}

impl ImageRenderer for CountingImage {
    fn render(&self, _prompt: &str, _size: [u32; 2], out: &Path) -> ReelResult<PathBuf> {
        self.calls.set(self.calls.get() + 1);
        write_asset(out)?;
        Ok(out.to_path_buf())
    }
}

struct CountingSpeech {
    calls: Cell<usize>,
}

impl SpeechSynthesizer for CountingSpeech {
    fn synthesize(&self, _text: &str, _voice: &str, out: &Path) -> ReelResult<PathBuf> {
        self.calls.set(self.calls.get() + 1);
        write_asset(out)?;
        Ok(out.to_path_buf())
    }
}

fn write_asset(out: &Path) -> ReelResult<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ReelError::generate(e.to_string()))?;
    }
    std::fs::write(out, b"asset").map_err(|e| ReelError::generate(e.to_string()))
}

struct Fixture {
    _dir: tempfile::TempDir,
    paths: ProjectPaths,
    template: Template,
    text: CountingText,
    image: CountingImage,
    speech: CountingSpeech,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::create(dir.path(), "story").unwrap();
        Self {
            _dir: dir,
            paths,
            template: serde_json::from_str(r#"{"font":"font.ttf"}"#).unwrap(),
            text: CountingText::new(),
            image: CountingImage { calls: Cell::new(0) },
            speech: CountingSpeech { calls: Cell::new(0) },
        }
    }

    fn context(&self) -> RunContext<'_> {
        RunContext {
            template: &self.template,
            paths: &self.paths,
            text_generator: &self.text,
            image_renderer: &self.image,
            speech: &self.speech,
            script: Some(ScriptRequest {
                text: SOURCE_TEXT.to_string(),
                segment_count: 3,
                style: "插画".to_string(),
            }),
            voice: Some("longwan".to_string()),
            max_caption_chars: None,
            output: self.paths.root.join("story.mp4"),
        }
    }

    fn run_generation(&self, store: &mut ItemStore) {
        let ctx = self.context();
        for stage in [
            StageId::Script,
            StageId::Prompts,
            StageId::Images,
            StageId::Audio,
            StageId::Duration,
        ] {
            run_stage(stage, store, &ctx).unwrap();
            store.save().unwrap();
        }
    }
}

#[test]
fn full_run_populates_store_and_assets_on_disk() {
    let fx = Fixture::new();
    let mut store = ItemStore::create(&fx.paths.item_file);
    fx.run_generation(&mut store);

    assert_eq!(store.items.len(), 4);
    for (i, item) in store.items.iter().enumerate() {
        assert!(item.has_caption_text(), "item {i} lost its text");
        assert!(item.has_prompt(), "item {i} has no prompt");
        assert!(item.has_image(), "item {i} has no image");
        assert!(item.has_audio(), "item {i} has no audio");
        assert!(item.duration.is_some_and(|d| d > 0.0));
        assert!(fx.paths.image_path(i).is_file());
        assert!(fx.paths.audio_path(i).is_file());
    }

    // 2 script calls + 4 prompt calls; one render and one narration per item.
    assert_eq!(fx.text.calls.get(), 6);
    assert_eq!(fx.image.calls.get(), 4);
    assert_eq!(fx.speech.calls.get(), 4);
}

#[test]
fn second_run_makes_no_external_calls() {
    let fx = Fixture::new();
    let mut store = ItemStore::create(&fx.paths.item_file);
    fx.run_generation(&mut store);
    let before = std::fs::read(&fx.paths.item_file).unwrap();
    let calls = (fx.text.calls.get(), fx.image.calls.get(), fx.speech.calls.get());

    // Fresh process: reload from disk, run again.
    let mut reloaded = ItemStore::load(&fx.paths.item_file).unwrap();
    fx.run_generation(&mut reloaded);

    assert_eq!(
        (fx.text.calls.get(), fx.image.calls.get(), fx.speech.calls.get()),
        calls,
        "a completed run must not call any collaborator again"
    );
    assert_eq!(std::fs::read(&fx.paths.item_file).unwrap(), before);
}

#[test]
fn resume_regenerates_only_the_cleared_fields() {
    let fx = Fixture::new();
    let mut store = ItemStore::create(&fx.paths.item_file);
    fx.run_generation(&mut store);
    let image_calls = fx.image.calls.get();
    let speech_calls = fx.speech.calls.get();

    // Simulate an interrupted run: one item never got its image or audio.
    store.items[2].image = None;
    store.items[2].audio = None;
    store.items[2].duration = None;
    store.save().unwrap();

    let mut reloaded = ItemStore::load(&fx.paths.item_file).unwrap();
    fx.run_generation(&mut reloaded);

    assert_eq!(fx.image.calls.get(), image_calls + 1);
    assert_eq!(fx.speech.calls.get(), speech_calls + 1);
    assert!(reloaded.items[2].has_image());
    assert!(reloaded.items[2].has_audio());
    assert!(reloaded.items[2].duration.is_some_and(|d| d > 0.0));
}

#[test]
fn hand_written_item_file_flows_through_the_stages() {
    let fx = Fixture::new();

    // Items authored out-of-band, in the role-text schema with bare-array
    // file shape, enter the pipeline exactly like generated ones.
    let raw = r#"[
        {"TextTop": "春眠不觉晓", "TextBottom": "处处闻啼鸟"},
        {"TextTop": "夜来风雨声", "TextBottom": "花落知多少"}
    ]"#;
    std::fs::write(&fx.paths.item_file, raw).unwrap();

    let mut store = ItemStore::load(&fx.paths.item_file).unwrap();
    fx.run_generation(&mut store);

    assert_eq!(store.items.len(), 2, "script stage must not add to a non-empty store");
    for item in &store.items {
        assert!(item.has_prompt());
        assert!(item.has_image());
        assert!(item.has_audio());
    }

    // Saved back in the same bare-array shape, fields merged in.
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&fx.paths.item_file).unwrap()).unwrap();
    let items = saved.as_array().expect("bare array shape preserved");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["TextTop"], "春眠不觉晓");
    assert!(items[0]["Image"].is_string());
}

#[test]
fn failed_items_leave_fields_unset_for_the_next_run() {
    struct FlakyImage {
        calls: Cell<usize>,
    }
    impl ImageRenderer for FlakyImage {
        fn render(&self, _prompt: &str, _size: [u32; 2], out: &Path) -> ReelResult<PathBuf> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            // The first two calls fail, everything after succeeds.
            if n <= 2 {
                return Err(ReelError::generate("rate limited"));
            }
            write_asset(out)?;
            Ok(out.to_path_buf())
        }
    }

    let fx = Fixture::new();
    let flaky = FlakyImage { calls: Cell::new(0) };
    let mut ctx = fx.context();
    ctx.image_renderer = &flaky;

    let mut store = ItemStore::create(&fx.paths.item_file);
    store.items = (0..4)
        .map(|i| Item {
            title: Some(format!("第{}段", i + 1)),
            subtitle: Some("字幕".to_string()),
            prompt: Some("p".to_string()),
            ..Item::default()
        })
        .collect();

    let report = run_stage(StageId::Images, &mut store, &ctx).unwrap();
    assert_eq!(report.completed, 2);
    assert_eq!(report.warnings, 2);

    // The retry picks up exactly the failed half.
    let report = run_stage(StageId::Images, &mut store, &ctx).unwrap();
    assert_eq!(report.skipped, 2);
    assert!(store.items.iter().all(Item::has_image));
}
