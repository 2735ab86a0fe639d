//! Script cleaning and chunking for speech synthesis.

use regex::Regex;
use std::sync::LazyLock;

/// Default character ceiling per synthesis request.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 4000;

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const SENTENCE_TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+ .*$").expect("heading pattern is valid"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("paragraph pattern is valid"));

/// Strips presentation markup from a script.
///
/// Heading lines are dropped, `**` emphasis markers removed, runs of three or
/// more newlines collapsed to one blank line, and the result trimmed.
#[must_use]
pub fn clean_story_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = HEADING_LINE.replace_all(&text, "");
    let text = text.replace("**", "");
    let text = BLANK_RUNS.replace_all(&text, PARAGRAPH_SEPARATOR);
    text.trim().to_string()
}

/// Splits text into chunks of at most `max_chars` characters.
///
/// Paragraphs are packed greedily in order, separated by a blank line. A
/// paragraph is never split unless it alone exceeds the ceiling, in which case
/// it is cut at sentence ends, or mid-sentence as a last resort.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max = max_chars.max(1);
    let separator_len = PARAGRAPH_SEPARATOR.len();

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in PARAGRAPH_BREAK.split(text).map(str::trim).filter(|p| !p.is_empty()) {
        let len = paragraph.chars().count();

        if len > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut pieces = split_paragraph(paragraph, max);
            let last = pieces.pop();
            chunks.extend(pieces);
            current = last.unwrap_or_default();
            current_len = current.chars().count();
            continue;
        }

        if current.is_empty() {
            current.push_str(paragraph);
            current_len = len;
        } else if current_len + separator_len + len <= max {
            current.push_str(PARAGRAPH_SEPARATOR);
            current.push_str(paragraph);
            current_len += separator_len + len;
        } else {
            chunks.push(std::mem::replace(&mut current, paragraph.to_string()));
            current_len = len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_paragraph(paragraph: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences(paragraph) {
        for part in hard_cut(sentence, max) {
            let len = part.chars().count();
            if current_len + len > max {
                push_trimmed(&mut pieces, &current);
                current.clear();
                current_len = 0;
            }
            current.push_str(part);
            current_len += len;
        }
    }
    push_trimmed(&mut pieces, &current);
    pieces
}

fn push_trimmed(pieces: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
}

/// Sentence slices including their trailing whitespace, so that
/// concatenating them restores the input.
fn sentences(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !SENTENCE_TERMINATORS.contains(&c) {
            continue;
        }
        let mut end = idx + c.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }
        spans.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        spans.push(&text[start..]);
    }
    spans
}

fn hard_cut(text: &str, max: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max {
            parts.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}
