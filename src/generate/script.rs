//! Script-stage request building, structured-reply parsing, and the
//! deterministic fallbacks used when the collaborator's reply is unusable.

use super::{GenOutcome, TextGenerator};

/// One scripted segment: a short on-screen title and the narration caption.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct ScriptSegment {
    pub title: String,
    pub subtitle: String,
}

/// Replies are often wrapped in markdown code fences; strip one layer.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let body = if let Some(rest) = trimmed.split_once("```json") {
        rest.1
    } else if let Some(rest) = trimmed.split_once("```") {
        rest.1
    } else {
        return trimmed;
    };
    body.split("```").next().unwrap_or(body).trim()
}

/// Parse a single-segment reply: an object with the two required text keys.
pub fn parse_cover(reply: &str) -> Result<ScriptSegment, String> {
    serde_json::from_str::<ScriptSegment>(strip_code_fences(reply))
        .map_err(|e| format!("cover reply is not a {{title, subtitle}} object: {e}"))
}

/// Parse a multi-segment reply: an array of segments. Length is validated by
/// the caller (a mismatched count is a warning, not a failure).
pub fn parse_segments(reply: &str) -> Result<Vec<ScriptSegment>, String> {
    serde_json::from_str::<Vec<ScriptSegment>>(strip_code_fences(reply))
        .map_err(|e| format!("script reply is not a segment array: {e}"))
}

pub fn cover_request(text: &str) -> String {
    format!(
        "请基于以下文本内容，生成一个视频封面场景：title（视频标题，不超过15字）和\
         subtitle（引导观众继续观看的字幕，20-40字，适合语音朗读）。\n\n文本内容：\n{text}\n\n\
         请以JSON对象格式返回，包含title和subtitle字段，只返回JSON对象，不要包含其他文字说明。"
    )
}

pub fn segments_request(text: &str, count: usize) -> String {
    format!(
        "请将以下文本内容改写为{count}段视频脚本。每段包含：title（该段标题，不超过10字）\
         和subtitle（该段字幕，用于语音合成）。\n\n文本内容：\n{text}\n\n\
         请以JSON数组格式返回，数组长度为{count}，每个元素包含title和subtitle字段，\
         只返回JSON数组，不要包含其他文字说明。"
    )
}

/// Template-filled default image prompt for when prompt generation fails.
pub fn default_image_prompt(text_top: &str, text_bottom: &str) -> String {
    format!(
        "9:16 vertical illustration, warm healing children's book style. \
         Upper section: {text_top}. Lower section: {text_bottom}. \
         Minimal background with ample white space."
    )
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Naive proportional partition of the source text into `count` segments,
/// used when the script reply cannot be parsed. Deterministic by design.
pub fn proportional_split(text: &str, count: usize) -> Vec<ScriptSegment> {
    let chars: Vec<char> = text.chars().collect();
    let count = count.max(1);
    let per = chars.len().div_ceil(count);
    (0..count)
        .map(|i| {
            let chunk: String = chars
                .iter()
                .skip(i * per)
                .take(per)
                .collect();
            ScriptSegment {
                title: format!("第{}段", i + 1),
                subtitle: chunk,
            }
        })
        .collect()
}

/// Cover derived directly from the source text, for the fallback path.
pub fn fallback_cover(text: &str) -> ScriptSegment {
    ScriptSegment {
        title: take_chars(text, 15),
        subtitle: take_chars(text, 40),
    }
}

/// Ask for the cover segment; degrade to the deterministic cover on any
/// call or parse failure.
pub fn generate_cover(generator: &dyn TextGenerator, text: &str) -> GenOutcome<ScriptSegment> {
    match generator.complete(&cover_request(text)) {
        Ok(reply) => match parse_cover(&reply) {
            Ok(segment) => GenOutcome::Generated(segment),
            Err(cause) => {
                tracing::warn!("{cause}, using fallback cover");
                GenOutcome::Fallback(fallback_cover(text))
            }
        },
        Err(e) => {
            tracing::warn!("cover generation call failed: {e}, using fallback cover");
            GenOutcome::Fallback(fallback_cover(text))
        }
    }
}

/// Ask for `count` content segments; a mismatched count is only warned, an
/// unusable reply degrades to the proportional split.
pub fn generate_segments(
    generator: &dyn TextGenerator,
    text: &str,
    count: usize,
) -> GenOutcome<Vec<ScriptSegment>> {
    match generator.complete(&segments_request(text, count)) {
        Ok(reply) => match parse_segments(&reply) {
            Ok(segments) => {
                if segments.len() != count {
                    tracing::warn!(
                        requested = count,
                        received = segments.len(),
                        "script segment count mismatch"
                    );
                }
                GenOutcome::Generated(segments)
            }
            Err(cause) => {
                tracing::warn!("{cause}, using proportional split");
                GenOutcome::Fallback(proportional_split(text, count))
            }
        },
        Err(e) => {
            tracing::warn!("script generation call failed: {e}, using proportional split");
            GenOutcome::Fallback(proportional_split(text, count))
        }
    }
}
