//! Seams to the external generation collaborators. The traits are the
//! interface boundary; network details live in [`clients`], and the
//! structured-reply parsing plus deterministic fallbacks live in [`script`].

use std::path::{Path, PathBuf};

use crate::error::ReelResult;

pub mod clients;
pub mod script;

pub trait TextGenerator {
    /// One prompt in, the collaborator's raw text reply out.
    fn complete(&self, prompt: &str) -> ReelResult<String>;
}

pub trait ImageRenderer {
    /// Render `prompt` at `size` (width, height) and persist to `out_path`.
    fn render(&self, prompt: &str, size: [u32; 2], out_path: &Path) -> ReelResult<PathBuf>;
}

pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> ReelResult<PathBuf>;
}

/// Three-way result of a generation call: a real reply, a deterministic
/// local fallback, or a failure that leaves the target field unset. Callers
/// branch on all three explicitly; nothing here raises past a stage boundary.
#[derive(Clone, Debug)]
pub enum GenOutcome<T> {
    Generated(T),
    Fallback(T),
    Failed(String),
}

impl<T> GenOutcome<T> {
    /// The produced value plus whether it came from the fallback path.
    pub fn into_value(self) -> Result<(T, bool), String> {
        match self {
            Self::Generated(v) => Ok((v, false)),
            Self::Fallback(v) => Ok((v, true)),
            Self::Failed(cause) => Err(cause),
        }
    }
}
