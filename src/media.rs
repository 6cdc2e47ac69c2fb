//! Thin wrappers over the system `ffmpeg`/`ffprobe` binaries. We deliberately
//! shell out rather than bind native FFmpeg libraries, so no dev headers are
//! required at build time.

use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::error::{ReelError, ReelResult};

pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Measured duration of an audio asset in seconds. Returns 0.0 on any
/// failure; callers treat zero as "unmeasurable" and apply their fallback.
pub fn probe_audio_duration(path: &Path) -> f64 {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: Option<ProbeFormat>,
    }

    let out = match Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
    {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to run ffprobe: {e}");
            return 0.0;
        }
    };
    if !out.status.success() {
        tracing::warn!(
            path = %path.display(),
            "ffprobe failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
        return 0.0;
    }

    serde_json::from_slice::<ProbeOut>(&out.stdout)
        .ok()
        .and_then(|p| p.format)
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0)
}

/// Concatenate audio files into one, for items narrated by two voice roles.
/// Tries a stream copy first and falls back to re-encoding when the inputs
/// disagree on codec parameters.
pub fn merge_audio_files(inputs: &[PathBuf], out_path: &Path) -> ReelResult<PathBuf> {
    if inputs.is_empty() {
        return Err(ReelError::generate("no audio files to merge"));
    }
    ensure_parent_dir(out_path)?;

    let list_path = out_path.with_extension("concat.txt");
    let mut list = String::new();
    for input in inputs {
        let abs = std::fs::canonicalize(input).map_err(|e| {
            ReelError::generate(format!("audio file '{}' unreadable: {e}", input.display()))
        })?;
        list.push_str(&format!("file '{}'\n", abs.display()));
    }
    std::fs::write(&list_path, list)
        .map_err(|e| ReelError::generate(format!("failed to write concat list: {e}")))?;

    let run = |codec_args: &[&str]| -> ReelResult<bool> {
        let out = Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(codec_args)
            .arg(out_path)
            .output()
            .map_err(|e| ReelError::generate(format!("failed to run ffmpeg: {e}")))?;
        if !out.status.success() {
            tracing::warn!(
                "ffmpeg audio concat failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(out.status.success())
    };

    let ok = run(&["-c", "copy"])? || run(&["-c:a", "libmp3lame"])?;
    let _ = std::fs::remove_file(&list_path);
    if !ok {
        return Err(ReelError::generate(format!(
            "ffmpeg could not concatenate audio into '{}'",
            out_path.display()
        )));
    }
    Ok(out_path.to_path_buf())
}
