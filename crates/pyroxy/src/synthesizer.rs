//! Assembles one R wrapper function per symbol.
//!
//! A wrapper is the roxygen block followed by a function that imports the
//! Python module through reticulate and forwards its arguments by position:
//!
//! ```r
//! #' Adds two numbers.
//! #'
//! #' @export
//! add <- function(a, b = 0L) {
//!     py_pkg <- reticulate::import("pkg.math")
//!     return(py_pkg$add(a, b))
//! }
//! ```

use std::{borrow::Cow, fmt::Write};

use log::{debug, warn};

use crate::{
    collector::Symbol,
    defaults::{self, DefaultValue, RLiteral},
    docstring::{self, ConvertOptions, StructuredDoc},
    error::Result,
};

/// Headers wider than this put one parameter per line
pub const HEADER_WIDTH: usize = 80;

const INDENT: &str = "    ";

/// Words that cannot be used as bare R names
const R_RESERVED: &[&str] = &[
    "if",
    "else",
    "repeat",
    "while",
    "function",
    "for",
    "next",
    "break",
    "in",
    "TRUE",
    "FALSE",
    "NULL",
    "Inf",
    "NaN",
    "NA",
    "NA_integer_",
    "NA_real_",
    "NA_character_",
    "NA_complex_",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesizeOptions {
    /// Passed to the docstring converter
    pub convert: ConvertOptions,
}

/// Render the complete wrapper text for `symbol`
pub fn synthesize(symbol: &Symbol, options: &SynthesizeOptions) -> Result<String> {
    let known_params = symbol.parameter_names();
    let converted = docstring::convert_with(&symbol.doc, &known_params, options.convert);
    reconcile(symbol, &known_params);

    let defaults: Vec<DefaultValue> = symbol
        .parameters
        .iter()
        .map(|param| param.default.clone())
        .collect();
    let literals = defaults::serialize_all(&defaults)?;

    let names: Vec<Cow<'_, str>> = symbol
        .parameters
        .iter()
        .map(|param| r_name(&param.name))
        .collect();
    let formals: Vec<String> = names
        .iter()
        .zip(&literals)
        .map(|(name, literal)| match literal {
            RLiteral::Absent => name.clone().into_owned(),
            RLiteral::Expr(expr) => format!("{name} = {expr}"),
        })
        .collect();

    let function_name = r_name(&symbol.name);
    let mut out = String::new();
    if !converted.comment.is_empty() {
        out.push_str(&converted.comment);
        out.push('\n');
    }
    write_header(&mut out, &function_name, &formals);
    let _ = writeln!(
        out,
        "{INDENT}py_pkg <- reticulate::import(\"{}\")",
        symbol.module
    );
    let _ = writeln!(
        out,
        "{INDENT}return(py_pkg${function_name}({}))",
        names.join(", ")
    );
    out.push('}');
    Ok(out)
}

fn write_header(out: &mut String, function_name: &str, formals: &[String]) {
    let single_line = format!("{function_name} <- function({}) {{", formals.join(", "));
    if formals.is_empty() || single_line.chars().count() <= HEADER_WIDTH {
        out.push_str(&single_line);
        out.push('\n');
        return;
    }
    let _ = writeln!(out, "{function_name} <- function(");
    for (i, formal) in formals.iter().enumerate() {
        let separator = if i + 1 < formals.len() { "," } else { "" };
        let _ = writeln!(out, "{INDENT}{formal}{separator}");
    }
    out.push_str(") {\n");
}

/// Parameters on which the docstring and the signature disagree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Documented but absent from the signature, in documentation order
    pub unknown: Vec<String>,
    /// In the signature but not documented, in signature order
    pub undocumented: Vec<String>,
}

/// Compare the `Parameters` section of the docstring with the signature.
///
/// The wrapper always follows the signature; mismatches are only logged.
pub fn reconcile(symbol: &Symbol, known: &[&str]) -> Reconciliation {
    let doc = StructuredDoc::parse(&symbol.doc);
    let documented: Vec<&str> = doc.parameter_names().collect();

    let mut result = Reconciliation::default();
    for name in &documented {
        if !known.contains(name) {
            warn!(
                "{}: documents parameter `{name}` that is not in the signature",
                symbol.qualified_name()
            );
            result.unknown.push((*name).to_owned());
        }
    }
    for name in known {
        if !documented.contains(name) {
            debug!("{}: parameter `{name}` is undocumented", symbol.qualified_name());
            result.undocumented.push((*name).to_owned());
        }
    }
    result
}

/// Quote `name` with backticks unless it is a syntactic R name
pub fn r_name(name: &str) -> Cow<'_, str> {
    if is_syntactic(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{name}`"))
    }
}

fn is_syntactic(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '.') {
        return false;
    }
    // `.2x` parses as a number
    if first == '.' && name[1..].starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        && !R_RESERVED.contains(&name)
}
