//! Section-level view of a numpydoc-style docstring.
//!
//! [`StructuredDoc::parse`] never fails: missing sections are left empty and
//! unrecognised text stays attached to whatever section precedes it.

use once_cell::sync::Lazy;
use regex::Regex;

/// An underlined header of one of the sections the converter understands
static KNOWN_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(Parameters|Returns|Raises|Notes|Examples)\n-+[ \t]*$")
        .expect("known header pattern is valid")
});

/// Parameter entry line: ``` ``name`` : ``` or `name : type`
static ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:``([A-Za-z_][A-Za-z0-9_]*)``|([A-Za-z_*][A-Za-z0-9_*]*))\s*:(.*)$")
        .expect("entry pattern is valid")
});

/// Byte offset of the next recognised section header in `text`, if any
pub(crate) fn next_known_header(text: &str) -> Option<usize> {
    KNOWN_HEADER.find(text).map(|m| m.start())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Parameters,
    Returns,
    Raises,
    Notes,
    Examples,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name {
            "Parameters" => Self::Parameters,
            "Returns" => Self::Returns,
            "Raises" => Self::Raises,
            "Notes" => Self::Notes,
            "Examples" => Self::Examples,
            _ => Self::Summary,
        }
    }
}

/// Parsed sections of a docstring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredDoc {
    pub summary: String,
    /// `(name, description)` in documentation order
    pub parameters: Vec<(String, String)>,
    pub returns: Option<String>,
    pub raises: Option<String>,
    pub notes: Option<String>,
    /// Kept verbatim, indentation included
    pub examples: Option<String>,
}

impl StructuredDoc {
    /// Split `raw` into its sections
    pub fn parse(raw: &str) -> Self {
        let mut doc = Self::default();
        if raw.trim().is_empty() {
            return doc;
        }

        let mut bodies: Vec<(Section, String)> = Vec::new();
        let mut cursor = 0;
        let mut section = Section::Summary;
        for caps in KNOWN_HEADER.captures_iter(raw) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            bodies.push((section, raw[cursor..whole.start()].to_owned()));
            section = Section::from_header(name.as_str());
            cursor = whole.end();
        }
        bodies.push((section, raw[cursor..].to_owned()));

        for (section, body) in bodies {
            match section {
                Section::Summary => doc.summary = collapse(&body),
                Section::Parameters => doc.parameters.extend(parse_entries(&body)),
                Section::Returns => doc.returns = non_empty(collapse(&body)),
                Section::Raises => doc.raises = non_empty(collapse(&body)),
                Section::Notes => doc.notes = non_empty(collapse(&body)),
                Section::Examples => {
                    doc.examples = non_empty(body.trim_matches('\n').trim_end().to_owned());
                }
            }
        }
        doc
    }

    /// Whether no section carries any text
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.parameters.is_empty()
            && self.returns.is_none()
            && self.raises.is_none()
            && self.notes.is_none()
            && self.examples.is_none()
    }

    /// Documented parameter names, in documentation order
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|(name, _)| name.as_str())
    }
}

/// Parse `name : ...` entries followed by indented description lines
fn parse_entries(body: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    let base_indent = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(indentation)
        .min()
        .unwrap_or(0);

    for line in body.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let is_entry_level = indentation(line) == base_indent;
        if is_entry_level && let Some(caps) = ENTRY.captures(line.trim()) {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim_start_matches('*').to_owned())
                .unwrap_or_default();
            entries.push((name, String::new()));
            continue;
        }
        if let Some((_, description)) = entries.last_mut() {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(line.trim());
        }
    }
    entries
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
