//! Caption segmentation: splits an overlong narration caption into
//! bounded-length chunks with a layered punctuation-aware strategy, producing
//! new items whose audio and duration must be regenerated.

use crate::item::Item;

/// Full-stop-equivalent marks; kept attached to the preceding chunk.
const SENTENCE_MARKS: &[char] = &['。', '！', '？', '.', '!', '?'];
/// Comma-equivalent marks used by the second pass.
const CLAUSE_MARKS: &[char] = &['，', ',', '、', '；', ';', '：', ':'];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// Split on a mark set, keeping each mark attached to the text before it.
// Parts are returned verbatim; whitespace is only trimmed at chunk edges so
// spacing inside a packed chunk survives.
fn split_keeping_marks(text: &str, marks: &[char]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    for ch in text.chars() {
        buf.push(ch);
        if marks.contains(&ch) {
            parts.push(std::mem::take(&mut buf));
        }
    }
    if !buf.is_empty() {
        parts.push(buf);
    }
    parts
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn hard_cut(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect::<String>())
        .collect()
}

/// Two-pass chunker. Every output chunk is at most `max_chars` characters,
/// except nothing: even atomic clauses longer than the limit are hard-cut.
/// Chunk order preserves the original reading order.
pub fn split_caption(text: &str, max_chars: usize) -> Vec<String> {
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    for sentence in split_keeping_marks(text, SENTENCE_MARKS) {
        if char_len(sentence.trim()) <= max_chars {
            push_trimmed(&mut chunks, &sentence);
            continue;
        }

        // Second pass: greedy clause packing under the limit.
        let mut buf = String::new();
        for clause in split_keeping_marks(&sentence, CLAUSE_MARKS) {
            let mut piece = clause.as_str();
            if buf.is_empty() {
                piece = piece.trim_start();
            } else if char_len(&buf) + char_len(piece) > max_chars {
                push_trimmed(&mut chunks, &std::mem::take(&mut buf));
                piece = clause.trim_start();
            }
            if char_len(piece) > max_chars {
                push_trimmed(&mut chunks, &std::mem::take(&mut buf));
                for cut in hard_cut(piece, max_chars) {
                    push_trimmed(&mut chunks, &cut);
                }
            } else {
                buf.push_str(piece);
            }
        }
        push_trimmed(&mut chunks, &buf);
    }
    chunks
}

/// Split one item into per-chunk items. `source_index` is the item's position
/// in the store, recorded in each chunk's provenance marker together with its
/// sub-index. Chunks copy every field from the source except `audio` and
/// `duration`, which are new content requiring new synthesis.
pub fn split_item(item: &Item, source_index: usize, max_chars: usize) -> Vec<Item> {
    let Some(caption) = item.secondary_text() else {
        return vec![item.clone()];
    };
    if char_len(caption) <= max_chars {
        return vec![item.clone()];
    }

    let use_subtitle = item.subtitle.as_deref().is_some_and(|s| !s.trim().is_empty());
    split_caption(caption, max_chars)
        .into_iter()
        .enumerate()
        .map(|(sub_index, chunk)| {
            let mut out = item.clone();
            if use_subtitle {
                out.subtitle = Some(chunk);
            } else {
                out.text_bottom = Some(chunk);
            }
            out.audio = None;
            out.duration = None;
            out.split_index = Some((source_index * 100 + sub_index) as u32);
            out
        })
        .collect()
}
