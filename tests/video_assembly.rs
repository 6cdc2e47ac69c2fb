//! Full assembly leg against real `ffmpeg`/`ffprobe` binaries. Skipped (with
//! a note) when the tools or a usable system font are absent.

use std::{path::PathBuf, process::Command};

use storyreel::{
    compose::Composer,
    media,
    slide::Slide,
    template::Template,
};

fn ffmpeg_tools_available() -> bool {
    media::is_ffmpeg_on_path() && media::is_ffprobe_on_path()
}

fn find_system_font() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.is_file())
}

fn synth_tone(out: &PathBuf, seconds: f64) -> anyhow::Result<()> {
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:sample_rate=44100",
            "-t",
            &format!("{seconds}"),
            "-c:a",
            "libmp3lame",
        ])
        .arg(out)
        .status()?;
    anyhow::ensure!(status.success(), "ffmpeg failed creating tone");
    Ok(())
}

fn template(font: &PathBuf) -> Template {
    serde_json::from_str(&format!(
        r#"{{"font": {:?}, "video_size": [320, 640], "fps": 12, "font_size": 24}}"#,
        font.display().to_string()
    ))
    .unwrap()
}

#[test]
fn slides_encode_to_a_playable_mp4() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return Ok(());
    }
    let Some(font) = find_system_font() else {
        eprintln!("skipping: no system font found");
        return Ok(());
    };

    let dir = tempfile::tempdir()?;
    let root = dir.path();

    // Two slide sources: a wide image that needs cropping and a tall one.
    let wide = root.join("wide.png");
    image::RgbaImage::from_pixel(640, 200, image::Rgba([200, 120, 40, 255])).save(&wide)?;
    let tall = root.join("tall.png");
    image::RgbaImage::from_pixel(200, 800, image::Rgba([40, 120, 200, 255])).save(&tall)?;

    let tone_a = root.join("a.mp3");
    synth_tone(&tone_a, 1.0)?;
    let tone_b = root.join("b.mp3");
    synth_tone(&tone_b, 0.5)?;

    let slides = vec![
        Slide {
            image: wide,
            audio: tone_a.clone(),
            title: Some("标题 Title".to_string()),
            subtitle: Some("第一张幻灯片的字幕".to_string()),
            duration: media::probe_audio_duration(&tone_a).max(0.5),
        },
        Slide {
            image: tall,
            audio: tone_b,
            title: None,
            subtitle: Some("a caption that wraps when it grows too long for one line".to_string()),
            duration: 0.5,
        },
    ];

    let template = template(&font);
    let mut composer = Composer::from_template(&template)?;

    // Frames come out at exactly the target size regardless of source shape.
    for (i, slide) in slides.iter().enumerate() {
        let frame = composer.compose_frame(slide, i == 0)?;
        assert_eq!((frame.width(), frame.height()), (320, 640));
    }

    let output = root.join("out.mp4");
    composer.create_video(&slides, root, &output)?;

    assert!(output.is_file());
    let duration = media::probe_audio_duration(&output);
    assert!(
        (1.0..5.0).contains(&duration),
        "expected roughly 1.5s of video, probed {duration}"
    );

    // Intermediates are cleaned up after encoding.
    assert!(!root.join("slides").exists());
    Ok(())
}

#[test]
fn merged_narration_measures_as_the_sum_of_its_parts() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return Ok(());
    }

    let dir = tempfile::tempdir()?;
    let a = dir.path().join("top.mp3");
    synth_tone(&a, 1.0)?;
    let b = dir.path().join("bottom.mp3");
    synth_tone(&b, 1.0)?;

    let merged = media::merge_audio_files(&[a, b], &dir.path().join("merged.mp3"))?;
    let duration = media::probe_audio_duration(&merged);
    assert!(
        (1.5..3.0).contains(&duration),
        "expected about 2s, probed {duration}"
    );
    Ok(())
}
