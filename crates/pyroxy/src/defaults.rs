//! Default-argument values and their R literal rendering.
//!
//! Values arrive already classified by the provider. Rendering is a pure tree
//! transform: every variant maps to one R literal form, and collections recurse
//! into their elements.

use std::fmt::Write;

use log::warn;

use crate::error::{GenerateError, Result};

/// A parameter default, classified into the kinds R can express as a literal
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// The parameter has no default at all
    Absent,
    /// `None`
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Lists, tuples and sets, in source order
    Sequence(Vec<DefaultValue>),
    /// Dicts, in source order, keys already rendered as text
    Mapping(Vec<(String, DefaultValue)>),
}

impl DefaultValue {
    /// Whether this is the absent marker
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Nesting depth: scalars are 0, each enclosing collection adds one
    pub fn depth(&self) -> usize {
        match self {
            Self::Sequence(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            Self::Mapping(entries) => {
                1 + entries
                    .iter()
                    .map(|(_, value)| value.depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }
}

/// Result of rendering a [`DefaultValue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RLiteral {
    /// No default: the caller must omit the whole `= literal` clause
    Absent,
    /// A complete R expression
    Expr(String),
}

/// Render a single default value
pub fn serialize(value: &DefaultValue) -> Result<RLiteral> {
    if value.is_absent() {
        return Ok(RLiteral::Absent);
    }
    let mut out = String::new();
    write_literal(value, &mut out)?;
    Ok(RLiteral::Expr(out))
}

/// Render a batch of default values, preserving order
pub fn serialize_all(values: &[DefaultValue]) -> Result<Vec<RLiteral>> {
    values.iter().map(serialize).collect()
}

fn write_literal(value: &DefaultValue, out: &mut String) -> Result<()> {
    match value {
        DefaultValue::Absent => return Err(GenerateError::AbsentInCollection),
        DefaultValue::Null => out.push_str("NULL"),
        DefaultValue::Boolean(true) => out.push_str("TRUE"),
        DefaultValue::Boolean(false) => out.push_str("FALSE"),
        DefaultValue::Integer(number) => {
            let _ = write!(out, "{number}L");
        }
        DefaultValue::Float(number) => write_float(*number, out),
        DefaultValue::String(text) => {
            if text.contains(['"', '\\']) {
                warn!("String default {text:?} contains quotes or backslashes; emitted unescaped");
            }
            out.push('"');
            out.push_str(text);
            out.push('"');
        }
        DefaultValue::Sequence(items) => {
            out.push_str("list(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(item, out)?;
            }
            out.push(')');
        }
        DefaultValue::Mapping(entries) => {
            out.push_str("list(");
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "\"{key}\" = ");
                write_literal(item, out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

fn write_float(number: f64, out: &mut String) {
    if number.is_nan() {
        out.push_str("NaN");
    } else if number.is_infinite() {
        out.push_str(if number > 0.0 { "Inf" } else { "-Inf" });
    } else {
        // Debug keeps the fractional part (`2.0`) and uses exponents for large magnitudes
        let _ = write!(out, "{number:?}");
    }
}
