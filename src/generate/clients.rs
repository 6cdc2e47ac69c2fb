//! Blocking HTTP implementations of the generation seams. One POST with a
//! JSON body and bearer auth per call; protocol details beyond that are the
//! collaborators' concern.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::blocking::Client;
use serde_json::json;

use super::{ImageRenderer, SpeechSynthesizer, TextGenerator};
use crate::{
    config::Credentials,
    error::{ReelError, ReelResult},
    media,
};

const ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
const ARK_IMAGE_MODEL: &str = "doubao-seedream-4-0-250828";
const DASHSCOPE_TTS_API: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text2speech/speech-synthesis";
const TEXT_MODEL: &str = "deepseek-chat";

fn http_client() -> ReelResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .map_err(|e| ReelError::generate(format!("failed to build HTTP client: {e}")))
}

fn check_status(resp: reqwest::blocking::Response, what: &str) -> ReelResult<reqwest::blocking::Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(ReelError::generate(format!(
            "{what} returned {status}: {}",
            body.trim()
        )));
    }
    Ok(resp)
}

/// DeepSeek chat-completions text generator.
pub struct DeepSeekText {
    client: Client,
    api_key: String,
    base_url: String,
}

impl DeepSeekText {
    pub fn new(credentials: &Credentials) -> ReelResult<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: credentials.deepseek_api_key.clone(),
            base_url: credentials.deepseek_base_url.clone(),
        })
    }
}

impl TextGenerator for DeepSeekText {
    fn complete(&self, prompt: &str) -> ReelResult<String> {
        #[derive(serde::Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(serde::Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(serde::Deserialize)]
        struct Message {
            content: String,
        }

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": TEXT_MODEL,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": 0.7,
            }))
            .send()
            .map_err(|e| ReelError::generate(format!("text generation request failed: {e}")))?;

        let parsed: ChatResponse = check_status(resp, "text generation")?
            .json()
            .map_err(|e| ReelError::generate(format!("text generation reply unreadable: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| ReelError::generate("text generation reply had no choices"))
    }
}

/// Ark image generation: render, receive a URL, download to `out_path`.
pub struct ArkImages {
    client: Client,
    api_key: String,
}

impl ArkImages {
    pub fn new(credentials: &Credentials) -> ReelResult<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: credentials.ark_api_key.clone(),
        })
    }
}

impl ImageRenderer for ArkImages {
    fn render(&self, prompt: &str, size: [u32; 2], out_path: &Path) -> ReelResult<PathBuf> {
        #[derive(serde::Deserialize)]
        struct ImagesResponse {
            data: Vec<ImageData>,
        }
        #[derive(serde::Deserialize)]
        struct ImageData {
            url: String,
        }

        media::ensure_parent_dir(out_path)?;

        let resp = self
            .client
            .post(format!("{ARK_BASE_URL}/images/generations"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": ARK_IMAGE_MODEL,
                "prompt": prompt,
                "size": format!("{}x{}", size[0], size[1]),
                "response_format": "url",
                "watermark": false,
            }))
            .send()
            .map_err(|e| ReelError::generate(format!("image generation request failed: {e}")))?;

        let parsed: ImagesResponse = check_status(resp, "image generation")?
            .json()
            .map_err(|e| ReelError::generate(format!("image generation reply unreadable: {e}")))?;
        let url = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.url)
            .ok_or_else(|| ReelError::generate("image generation reply had no data"))?;

        let bytes = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map_err(|e| ReelError::generate(format!("image download failed: {e}")))?;
        std::fs::write(out_path, &bytes).map_err(|e| {
            ReelError::generate(format!("failed to write image '{}': {e}", out_path.display()))
        })?;
        tracing::info!(path = %out_path.display(), "image saved");
        Ok(out_path.to_path_buf())
    }
}

/// DashScope speech synthesis returning mp3 bytes directly.
pub struct DashScopeSpeech {
    client: Client,
    api_key: String,
}

impl DashScopeSpeech {
    pub fn new(credentials: &Credentials) -> ReelResult<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: credentials.dashscope_api_key.clone(),
        })
    }
}

impl SpeechSynthesizer for DashScopeSpeech {
    fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> ReelResult<PathBuf> {
        media::ensure_parent_dir(out_path)?;

        let resp = self
            .client
            .post(DASHSCOPE_TTS_API)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": "cosyvoice-v1",
                "input": {"text": text},
                "parameters": {"voice": voice, "format": "mp3"},
            }))
            .send()
            .map_err(|e| ReelError::generate(format!("speech synthesis request failed: {e}")))?;

        let bytes = check_status(resp, "speech synthesis")?
            .bytes()
            .map_err(|e| ReelError::generate(format!("speech synthesis reply unreadable: {e}")))?;
        std::fs::write(out_path, &bytes).map_err(|e| {
            ReelError::generate(format!("failed to write audio '{}': {e}", out_path.display()))
        })?;
        tracing::info!(path = %out_path.display(), "audio saved");
        Ok(out_path.to_path_buf())
    }
}
