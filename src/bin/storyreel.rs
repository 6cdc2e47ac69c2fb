use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use storyreel::{
    config::{Credentials, RunConfig},
    generate::clients::{ArkImages, DashScopeSpeech, DeepSeekText},
    pipeline::{RunContext, ScriptRequest, run_pipeline},
    project::{DEFAULT_BASE_DIR, ProjectPaths},
    store::ItemStore,
    template::{self, DEFAULT_TEMPLATE, Template},
};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline from a run-input JSON file.
    Run(RunArgs),
    /// Resume a previous run from its item file.
    Resume(ResumeArgs),
    /// List available templates.
    Templates(TemplatesArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Run-input JSON (name, text, images, video_size, voice, font, ...).
    #[arg(long = "in")]
    input: PathBuf,

    /// Template name; run-input fields override its rendering parameters.
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: String,

    /// Directory holding template JSON files.
    #[arg(long, default_value = "templates")]
    templates_dir: PathBuf,

    /// Base directory for per-project working directories.
    #[arg(long, default_value = DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    /// Split captions longer than this many characters into separate slides.
    #[arg(long)]
    max_caption_chars: Option<usize>,
}

#[derive(Parser, Debug)]
struct ResumeArgs {
    /// Item file of the run to resume; assets are expected next to it.
    #[arg(long)]
    items: PathBuf,

    /// Directory holding template JSON files.
    #[arg(long, default_value = "templates")]
    templates_dir: PathBuf,

    /// Split captions longer than this many characters into separate slides.
    #[arg(long)]
    max_caption_chars: Option<usize>,
}

#[derive(Parser, Debug)]
struct TemplatesArgs {
    /// Directory holding template JSON files.
    #[arg(long, default_value = "templates")]
    templates_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Resume(args) => cmd_resume(args),
        Command::Templates(args) => cmd_templates(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = RunConfig::load(&args.input)?;
    let credentials = Credentials::from_env();
    credentials.validate()?;

    let mut template = template::load_template(&args.templates_dir, &args.template)?;
    apply_overrides(&mut template, &config);

    let paths = ProjectPaths::create(&args.base_dir, &config.name)?;
    let mut store = if paths.item_file.exists() {
        tracing::info!(path = %paths.item_file.display(), "resuming from existing item file");
        ItemStore::load(&paths.item_file)?
    } else {
        ItemStore::create(&paths.item_file)
    };

    let text_generator = DeepSeekText::new(&credentials)?;
    let image_renderer = ArkImages::new(&credentials)?;
    let speech = DashScopeSpeech::new(&credentials)?;

    let ctx = RunContext {
        template: &template,
        paths: &paths,
        text_generator: &text_generator,
        image_renderer: &image_renderer,
        speech: &speech,
        script: Some(ScriptRequest {
            text: config.text.clone(),
            segment_count: config.images,
            style: config.style.clone(),
        }),
        voice: Some(config.voice.clone()),
        max_caption_chars: args.max_caption_chars,
        output: paths.output_path(&config.name),
    };

    report(run_pipeline(&mut store, &ctx)?)
}

fn cmd_resume(args: ResumeArgs) -> anyhow::Result<()> {
    let credentials = Credentials::from_env();
    credentials.validate()?;

    let store_path = args.items.clone();
    let mut store = ItemStore::load(&store_path)?;
    let template = template::load_template(&args.templates_dir, store.template_name())?;
    let paths = ProjectPaths::for_item_file(&store_path);

    let name = store_path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("item file has no usable name")?
        .to_string();

    let text_generator = DeepSeekText::new(&credentials)?;
    let image_renderer = ArkImages::new(&credentials)?;
    let speech = DashScopeSpeech::new(&credentials)?;

    let ctx = RunContext {
        template: &template,
        paths: &paths,
        text_generator: &text_generator,
        image_renderer: &image_renderer,
        speech: &speech,
        script: None,
        voice: None,
        max_caption_chars: args.max_caption_chars,
        output: paths.output_path(&name),
    };

    report(run_pipeline(&mut store, &ctx)?)
}

fn cmd_templates(args: TemplatesArgs) -> anyhow::Result<()> {
    let names = template::list_templates(&args.templates_dir);
    if names.is_empty() {
        println!("no templates found in '{}'", args.templates_dir.display());
        return Ok(());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn apply_overrides(template: &mut Template, config: &RunConfig) {
    template.video_size = config.video_size;
    template.font = config.font.clone();
    template.font_size = config.font_size;
    template.text_color = config.font_color.clone();
}

fn report(report: storyreel::PipelineReport) -> anyhow::Result<()> {
    for (stage, r) in &report.stages {
        tracing::info!(
            stage = stage.name(),
            completed = r.completed,
            skipped = r.skipped,
            warnings = r.warnings,
            "stage summary"
        );
    }
    let warnings = report.warnings();
    if warnings > 0 {
        tracing::warn!(count = warnings, "run finished with warnings");
    }
    let output = report.output.context("pipeline produced no output")?;
    println!("{}", output.display());
    Ok(())
}
