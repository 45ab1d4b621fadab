//! Paragraph filling with the semantics of Python's `textwrap.fill`.
//!
//! Every whitespace character becomes a single space, the text is cut into
//! alternating word and whitespace chunks, and lines are filled greedily.
//! Whitespace is dropped at the end of every line and at the start of every
//! line but the first. Words longer than a line are split.
//!
//! Hyphenated words are separate chunks (`long-term` is `long-` and `term`)
//! when the hyphen follows two letters, or a letter, a hyphen and a letter,
//! and is followed by a letter. A run of two or more hyphens after a word
//! character and before another is a chunk of its own.

/// Fill `text` into lines no wider than `width` characters (indent included)
pub(crate) fn fill(
    text: &str,
    width: usize,
    initial_indent: &str,
    subsequent_indent: &str,
) -> String {
    wrap(text, width, initial_indent, subsequent_indent).join("\n")
}

/// Same as [`fill`] but returns the individual lines
pub(crate) fn wrap(
    text: &str,
    width: usize,
    initial_indent: &str,
    subsequent_indent: &str,
) -> Vec<String> {
    let munged: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();

    // Reversed so that the next chunk is always at the end
    let mut chunks: Vec<String> = split_chunks(&munged).into_iter().rev().collect();
    let mut lines: Vec<String> = Vec::new();

    while !chunks.is_empty() {
        let indent = if lines.is_empty() {
            initial_indent
        } else {
            subsequent_indent
        };
        let line_width = width.saturating_sub(char_len(indent));

        if !lines.is_empty() && chunks.last().is_some_and(|chunk| is_blank(chunk)) {
            chunks.pop();
        }

        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0;
        while let Some(chunk) = chunks.last() {
            let len = char_len(chunk);
            if current_len + len > line_width {
                break;
            }
            current_len += len;
            if let Some(chunk) = chunks.pop() {
                current.push(chunk);
            }
        }

        if chunks.last().is_some_and(|chunk| char_len(chunk) > line_width) {
            break_long_word(&mut chunks, &mut current, current_len, line_width);
        }

        if current.last().is_some_and(|chunk| is_blank(chunk)) {
            current.pop();
        }

        if !current.is_empty() {
            lines.push(format!("{indent}{}", current.concat()));
        }
    }

    lines
}

/// Move as much of the oversized next chunk as fits onto the current line,
/// preferring to cut right after its last hyphen
fn break_long_word(
    chunks: &mut [String],
    current: &mut Vec<String>,
    current_len: usize,
    line_width: usize,
) {
    let space_left = if line_width < 1 {
        1
    } else {
        line_width.saturating_sub(current_len)
    };
    let Some(chunk) = chunks.last_mut() else {
        return;
    };
    let chars: Vec<char> = chunk.chars().collect();
    let mut end = space_left.min(chars.len());
    if chars.len() > space_left
        && let Some(hyphen) = chars[..end].iter().rposition(|&c| c == '-')
        && chars[..hyphen].iter().any(|&c| c != '-')
    {
        end = hyphen + 1;
    }
    let split_at = chunk
        .char_indices()
        .nth(end)
        .map_or(chunk.len(), |(idx, _)| idx);
    let tail = chunk.split_off(split_at);
    current.push(std::mem::replace(chunk, tail));
}

/// Split into runs of spaces, dash runs and (possibly hyphenated) words
fn split_chunks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = if chars[start] == ' ' {
            start + chars[start..].iter().take_while(|&&c| c == ' ').count()
        } else if let Some(end) = dash_run_end(&chars, start) {
            end
        } else {
            word_end(&chars, start)
        };
        chunks.push(chars[start..end].iter().collect());
        start = end;
    }
    chunks
}

/// End of a run of two or more hyphens between a word character and a
/// word character
fn dash_run_end(chars: &[char], start: usize) -> Option<usize> {
    if start == 0 || !is_word_punct(chars[start - 1]) {
        return None;
    }
    let run = chars[start..].iter().take_while(|&&c| c == '-').count();
    let end = start + run;
    (run >= 2 && chars.get(end).copied().is_some_and(is_word_char)).then_some(end)
}

/// Shortest non-space prefix that ends a word, a hyphenated word part or
/// the text before a dash run
fn word_end(chars: &[char], start: usize) -> usize {
    let at = |idx: usize| chars.get(idx).copied();
    let letter_at = |idx: usize| at(idx).is_some_and(is_letter);
    let mut end = start + 1;
    while end < chars.len() && chars[end] != ' ' {
        if chars[end] == '-' {
            let after_letters = end >= 2 && letter_at(end - 2) && letter_at(end - 1);
            let after_compound = end >= 3
                && letter_at(end - 3)
                && at(end - 2) == Some('-')
                && letter_at(end - 1);
            let before_letters = letter_at(end + 1)
                && (letter_at(end + 2) || (at(end + 2) == Some('-') && letter_at(end + 3)));
            if (after_letters || after_compound) && before_letters {
                return end + 1;
            }
            if dash_run_end(chars, end).is_some() {
                return end;
            }
        }
        end += 1;
    }
    end
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_letter(c: char) -> bool {
    is_word_char(c) && !c.is_numeric()
}

fn is_word_punct(c: char) -> bool {
    is_word_char(c) || matches!(c, '!' | '"' | '\'' | '&' | '.' | ',' | '?')
}

fn is_blank(chunk: &str) -> bool {
    chunk.trim().is_empty()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
