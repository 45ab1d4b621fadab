//! Conversion of numpydoc-style docstrings into roxygen2 comment blocks.
//!
//! The converter is a fixed sequence of text rewrites. Each stage sees the
//! output of the previous one, so the order of the stages is part of the
//! contract:
//!
//! 1. set aside `Examples` bodies (they are never reflowed)
//! 2. drop the `Parameters` header
//! 3. turn ``` ``name`` : ``` entries into `@param name`
//! 4. turn the `Returns` header into `@returns`
//! 5. append `@export`
//! 6. drop the `Raises` header, turn `` `Error` : `` entries into `@section Throws:`
//!    and the `Notes` header into `@details`
//! 7. remove pairs of consecutive whitespace characters (indentation residue)
//! 8. split on `@`, wrap every block, group blocks by tag kind

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use ruff_python_trivia::textwrap::dedent;

pub mod sections;
mod wrap;

pub use sections::StructuredDoc;

/// Column limit of wrapped comment lines
pub const DEFAULT_WIDTH: usize = 70;

const FIRST_LINE_PREFIX: &str = "#' ";
const CONTINUATION_PREFIX: &str = "#'   ";
const BLANK_LINE: &str = "#'";

/// Tag kinds that get a blank comment line before their first block
const GROUPED_TAGS: [&str; 4] = ["param", "returns", "section", "export"];

static PARAMETERS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Parameters\n-+").expect("parameters header pattern is valid"));
static PARAMETER_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+``([a-zA-Z_][a-zA-Z0-9_]*)``\s*:\n\s*[.\n]*")
        .expect("parameter entry pattern is valid")
});
static RETURNS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Returns\n-+\n").expect("returns header pattern is valid"));
static EXAMPLES_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Examples\n-+\n").expect("examples header pattern is valid"));
static RAISES_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Raises\n-+\n").expect("raises header pattern is valid"));
static THROWS_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`(.*)` :\n\s*(.*)").expect("throws entry pattern is valid"));
static NOTES_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Notes\n-+\n").expect("notes header pattern is valid"));
static WHITESPACE_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2}").expect("whitespace pair pattern is valid"));
static LEADING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#' @(\w+)").expect("leading tag pattern is valid"));
static PARAM_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@param (\S*)").expect("param tag pattern is valid"));

/// Options for [`convert_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Maximum width of wrapped lines, prefix included
    pub width: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
        }
    }
}

/// Output of a docstring conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Converted {
    /// The roxygen block, one `#'` line per line, no trailing newline
    pub comment: String,
    /// Names found in `@param` tags, in order of appearance
    pub documented_params: Vec<String>,
}

/// Convert `raw` with the default options
///
/// `known_params` is accepted for symmetry with the synthesizer; entries that
/// disagree with it are kept as written and reconciled by the caller.
pub fn convert(raw: &str, known_params: &[&str]) -> Converted {
    convert_with(raw, known_params, ConvertOptions::default())
}

/// Convert `raw` into a roxygen block
pub fn convert_with(raw: &str, _known_params: &[&str], options: ConvertOptions) -> Converted {
    if raw.is_empty() {
        return Converted::default();
    }

    let (text, examples) = set_aside_examples(raw);
    let text = rewrite_sections(&text);
    let text = WHITESPACE_PAIR.replace_all(&text, "");
    let blocks = render_blocks(&text, &examples, options.width);
    let comment = group_and_trim(blocks);

    let documented_params = PARAM_TAG
        .captures_iter(&comment)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .collect();

    Converted {
        comment,
        documented_params,
    }
}

/// Replace every `Examples` header with an `@examples` marker and collect the
/// section bodies, which run until the next recognised header
fn set_aside_examples(raw: &str) -> (String, Vec<String>) {
    let mut text = raw.to_owned();
    let mut bodies = Vec::new();
    while let Some(header) = EXAMPLES_HEADER.find(&text) {
        let rest = &text[header.end()..];
        let body_len = sections::next_known_header(rest).unwrap_or(rest.len());
        bodies.push(rest[..body_len].to_owned());
        text = format!(
            "{}@examples {}",
            &text[..header.start()],
            &rest[body_len..]
        );
    }
    (text, bodies)
}

fn rewrite_sections(text: &str) -> String {
    let text = PARAMETERS_HEADER.replace_all(text, "");
    let text = PARAMETER_ENTRY.replace_all(&text, "\n@param ${1} ");
    let text = RETURNS_HEADER.replace_all(&text, "@returns ");
    let mut text = text.into_owned();
    text.push_str("@export");
    let text = RAISES_HEADER.replace_all(&text, "");
    let text = THROWS_ENTRY.replace_all(&text, "\n@section Throws: ${1} ${2}");
    NOTES_HEADER.replace_all(&text, "@details ").into_owned()
}

/// Split on `@` and wrap each block; `@examples` blocks take their body from
/// the set-aside sections instead
fn render_blocks(text: &str, examples: &[String], width: usize) -> Vec<String> {
    let mut examples = examples.iter();
    let mut blocks = Vec::new();
    for (i, piece) in text.split('@').enumerate() {
        let block: Cow<'_, str> = if i == 0 {
            Cow::Borrowed(piece)
        } else {
            Cow::Owned(format!("@{piece}"))
        };
        let rendered = if block.starts_with("@examples") {
            render_examples(examples.next().map_or("", String::as_str))
        } else {
            wrap::fill(&block, width, FIRST_LINE_PREFIX, CONTINUATION_PREFIX)
        };
        if !rendered.is_empty() {
            blocks.push(rendered);
        }
    }
    blocks
}

fn render_examples(body: &str) -> String {
    let body = dedent(body);
    let mut lines = vec![format!("{FIRST_LINE_PREFIX}@examples")];
    let code: Vec<&str> = body.lines().collect();
    let start = code.iter().position(|line| !line.trim().is_empty());
    let end = code.iter().rposition(|line| !line.trim().is_empty());
    if let (Some(start), Some(end)) = (start, end) {
        for line in &code[start..=end] {
            let line = line.trim_end();
            if line.is_empty() {
                lines.push(BLANK_LINE.to_owned());
            } else {
                lines.push(format!("{FIRST_LINE_PREFIX}{line}"));
            }
        }
    }
    lines.join("\n")
}

/// Put a blank comment line in front of each change of grouped tag kind, then
/// drop a blank line left dangling at either end
fn group_and_trim(blocks: Vec<String>) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_kind: Option<String> = None;
    for block in blocks {
        let kind = LEADING_TAG
            .captures(&block)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned());
        if let Some(kind) = kind.as_deref()
            && GROUPED_TAGS.contains(&kind)
            && previous_kind.as_deref() != Some(kind)
        {
            lines.push(BLANK_LINE.to_owned());
        }
        previous_kind = kind;
        lines.push(block);
    }

    if lines.first().is_some_and(|line| line == BLANK_LINE) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|line| line == BLANK_LINE) {
        lines.pop();
    }
    lines.join("\n")
}
