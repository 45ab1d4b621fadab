//! Static reflection over Python sources on disk.
//!
//! Modules are located with [`ModuleResolver`] and parsed with
//! `ruff_python_parser`; nothing is imported or executed. A function is any
//! `def` or `async def` statement run at import time by the module's own
//! file: top-level ones and those nested in module-level `if`, `try` and
//! `with` blocks. Every branch counts since none is evaluated.

use std::{fs, path::PathBuf};

use log::{debug, trace};
use ruff_python_ast::{
    ExceptHandler, Expr, Number, Parameter, ParameterWithDefault, Stmt, StmtFunctionDef, UnaryOp,
};
use ruff_text_size::Ranged;

use super::{FunctionInfo, ModuleProvider, ParameterInfo, UnsupportedDefault};
use crate::{
    defaults::DefaultValue,
    error::{GenerateError, Result},
    resolver::{ModuleLocation, ModuleResolver},
    types::{FxIndexMap, ModuleKind},
};

/// Provider reading `.py` files from the configured source roots
#[derive(Debug)]
pub struct SourceTreeProvider {
    resolver: ModuleResolver,
}

impl SourceTreeProvider {
    pub fn new(resolver: ModuleResolver) -> Self {
        Self { resolver }
    }

    /// Search the given roots, then `PYTHONPATH`
    pub fn from_roots(src: Vec<PathBuf>) -> Self {
        Self::new(ModuleResolver::new(src))
    }

    fn locate(&self, module: &str) -> Result<ModuleLocation> {
        self.resolver
            .resolve(module)
            .ok_or_else(|| GenerateError::module_resolution(module, "not found on the search path"))
    }
}

impl ModuleProvider for SourceTreeProvider {
    fn kind(&self, module: &str) -> Result<ModuleKind> {
        Ok(self.locate(module)?.kind())
    }

    fn children(&self, package: &str) -> Result<Vec<String>> {
        let location = self.locate(package)?;
        if location.kind().is_leaf() {
            return Ok(Vec::new());
        }
        self.resolver.children(&location)
    }

    fn functions(&self, module: &str) -> Result<Vec<FunctionInfo>> {
        let location = self.locate(module)?;
        let Some(path) = location.source_file() else {
            return Ok(Vec::new());
        };
        let source = fs::read_to_string(path).map_err(|e| GenerateError::io(path, e))?;
        let functions = parse_functions(&source)
            .map_err(|reason| GenerateError::module_resolution(module, reason))?;
        debug!(
            "Found {} function(s) in {} ({})",
            functions.len(),
            module,
            path.display()
        );
        Ok(functions)
    }

    fn origin(&self, module: &str) -> Option<PathBuf> {
        match self.resolver.resolve(module)? {
            ModuleLocation::Package { init, .. } => Some(init),
            ModuleLocation::Module { file } => Some(file),
            ModuleLocation::NamespacePackage { dirs } => dirs.into_iter().next(),
        }
    }
}

/// Extract the module-level functions of a module's source text.
///
/// A later definition of a name replaces an earlier one, in source order
/// across branches.
pub fn parse_functions(source: &str) -> std::result::Result<Vec<FunctionInfo>, String> {
    let parsed = ruff_python_parser::parse_module(source).map_err(|e| e.to_string())?;
    let module = parsed.into_syntax();

    let mut functions: FxIndexMap<String, FunctionInfo> = FxIndexMap::default();
    collect_functions(&module.body, source, &mut functions);
    Ok(functions.into_values().collect())
}

fn collect_functions(
    body: &[Stmt],
    source: &str,
    functions: &mut FxIndexMap<String, FunctionInfo>,
) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(func_def) => {
                let info = function_info(func_def, source);
                trace!("Parsed function {} ({} params)", info.name, info.parameters.len());
                functions.insert(info.name.clone(), info);
            }
            Stmt::If(stmt_if) => {
                collect_functions(&stmt_if.body, source, functions);
                for clause in &stmt_if.elif_else_clauses {
                    collect_functions(&clause.body, source, functions);
                }
            }
            Stmt::Try(stmt_try) => {
                collect_functions(&stmt_try.body, source, functions);
                for handler in &stmt_try.handlers {
                    let ExceptHandler::ExceptHandler(handler) = handler;
                    collect_functions(&handler.body, source, functions);
                }
                collect_functions(&stmt_try.orelse, source, functions);
                collect_functions(&stmt_try.finalbody, source, functions);
            }
            Stmt::With(stmt_with) => collect_functions(&stmt_with.body, source, functions),
            _ => {}
        }
    }
}

fn function_info(func_def: &StmtFunctionDef, source: &str) -> FunctionInfo {
    let params = &func_def.parameters;
    let mut parameters = Vec::new();

    for param in params.posonlyargs.iter().chain(&params.args) {
        parameters.push(parameter_with_default(param, source));
    }
    if let Some(vararg) = &params.vararg {
        parameters.push(bare_parameter(vararg));
    }
    for param in &params.kwonlyargs {
        parameters.push(parameter_with_default(param, source));
    }
    if let Some(kwarg) = &params.kwarg {
        parameters.push(bare_parameter(kwarg));
    }

    FunctionInfo {
        name: func_def.name.as_str().to_owned(),
        doc: docstring(&func_def.body).map(|raw| cleandoc(&raw)),
        parameters,
    }
}

fn parameter_with_default(param: &ParameterWithDefault, source: &str) -> ParameterInfo {
    let name = param.parameter.name.as_str().to_owned();
    match &param.default {
        None => ParameterInfo::new(name, DefaultValue::Absent),
        Some(default) => ParameterInfo {
            name,
            default: classify_default(default, source),
        },
    }
}

fn bare_parameter(param: &Parameter) -> ParameterInfo {
    ParameterInfo::new(param.name.as_str(), DefaultValue::Absent)
}

/// The string literal opening a function body, if any
fn docstring(body: &[Stmt]) -> Option<String> {
    let Some(Stmt::Expr(expr_stmt)) = body.first() else {
        return None;
    };
    if let Expr::StringLiteral(string_lit) = expr_stmt.value.as_ref() {
        Some(string_lit.value.to_str().to_owned())
    } else {
        None
    }
}

/// Classify a default expression into a [`DefaultValue`].
///
/// Only literal syntax is accepted: names, calls, attribute accesses and the
/// like are reported with their source text.
pub fn classify_default(
    expr: &Expr,
    source: &str,
) -> std::result::Result<DefaultValue, UnsupportedDefault> {
    let unsupported = || UnsupportedDefault {
        description: source[expr.range()].to_owned(),
    };

    match expr {
        Expr::NoneLiteral(_) => Ok(DefaultValue::Null),
        Expr::BooleanLiteral(boolean) => Ok(DefaultValue::Boolean(boolean.value)),
        Expr::StringLiteral(string_lit) => {
            Ok(DefaultValue::String(string_lit.value.to_str().to_owned()))
        }
        Expr::NumberLiteral(number) => match &number.value {
            Number::Int(int) => int.as_i64().map(DefaultValue::Integer).ok_or_else(unsupported),
            Number::Float(float) => Ok(DefaultValue::Float(*float)),
            Number::Complex { .. } => Err(unsupported()),
        },
        Expr::UnaryOp(unary) if matches!(unary.op, UnaryOp::USub | UnaryOp::UAdd) => {
            let negate = matches!(unary.op, UnaryOp::USub);
            let Expr::NumberLiteral(number) = unary.operand.as_ref() else {
                return Err(unsupported());
            };
            match &number.value {
                Number::Int(int) => {
                    let magnitude = i128::from(int.as_u64().ok_or_else(unsupported)?);
                    let value = if negate { -magnitude } else { magnitude };
                    i64::try_from(value)
                        .map(DefaultValue::Integer)
                        .map_err(|_| unsupported())
                }
                Number::Float(float) => {
                    Ok(DefaultValue::Float(if negate { -*float } else { *float }))
                }
                Number::Complex { .. } => Err(unsupported()),
            }
        }
        Expr::List(list) => classify_sequence(&list.elts, source),
        Expr::Tuple(tuple) => classify_sequence(&tuple.elts, source),
        Expr::Set(set) => classify_sequence(&set.elts, source),
        Expr::Dict(dict) => {
            let mut entries = Vec::with_capacity(dict.items.len());
            for item in &dict.items {
                // `**spread` entries have no key
                let Some(key) = &item.key else {
                    return Err(unsupported());
                };
                let key = key_text(&classify_default(key, source)?).ok_or_else(unsupported)?;
                entries.push((key, classify_default(&item.value, source)?));
            }
            Ok(DefaultValue::Mapping(entries))
        }
        _ => Err(unsupported()),
    }
}

fn classify_sequence(
    elts: &[Expr],
    source: &str,
) -> std::result::Result<DefaultValue, UnsupportedDefault> {
    elts.iter()
        .map(|elt| classify_default(elt, source))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(DefaultValue::Sequence)
}

/// How Python's `str()` shows a scalar dict key
fn key_text(key: &DefaultValue) -> Option<String> {
    match key {
        DefaultValue::Null => Some("None".to_owned()),
        DefaultValue::Boolean(true) => Some("True".to_owned()),
        DefaultValue::Boolean(false) => Some("False".to_owned()),
        DefaultValue::Integer(n) => Some(n.to_string()),
        DefaultValue::Float(f) => Some(format!("{f:?}")),
        DefaultValue::String(s) => Some(s.clone()),
        DefaultValue::Absent | DefaultValue::Sequence(_) | DefaultValue::Mapping(_) => None,
    }
}

/// Clean a docstring the way `inspect.cleandoc` does: expand tabs, strip the
/// first line's leading whitespace, remove the common indentation of the
/// remaining lines and drop blank lines at both ends
pub fn cleandoc(raw: &str) -> String {
    let expanded: Vec<String> = raw.split('\n').map(expand_tabs).collect();

    let margin = expanded
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.chars().count() - line.trim_start().chars().count())
        .min();

    let mut lines: Vec<String> = Vec::with_capacity(expanded.len());
    for (i, line) in expanded.into_iter().enumerate() {
        if i == 0 {
            lines.push(line.trim_start().to_owned());
        } else if let Some(margin) = margin {
            lines.push(line.chars().skip(margin).collect());
        } else {
            lines.push(line);
        }
    }

    while lines.first().is_some_and(|line| line.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    const TAB_SIZE: usize = 8;
    let mut expanded = String::with_capacity(line.len());
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let spaces = TAB_SIZE - column % TAB_SIZE;
            expanded.extend(std::iter::repeat_n(' ', spaces));
            column += spaces;
        } else {
            expanded.push(ch);
            column += 1;
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn defaults_of(source: &str) -> Vec<std::result::Result<DefaultValue, UnsupportedDefault>> {
        parse_functions(source)
            .expect("source parses")
            .into_iter()
            .next()
            .expect("one function")
            .parameters
            .into_iter()
            .map(|param| param.default)
            .collect()
    }

    #[test]
    fn test_literal_defaults() {
        let defaults = defaults_of(
            "def f(a, b=0, c=-3, d=1.5, e='x', f=None, g=True, h=[1, (2, 3)], i={'k': {1: False}}):\n    pass\n",
        );
        assert_eq!(
            defaults,
            vec![
                Ok(DefaultValue::Absent),
                Ok(DefaultValue::Integer(0)),
                Ok(DefaultValue::Integer(-3)),
                Ok(DefaultValue::Float(1.5)),
                Ok(DefaultValue::String("x".to_owned())),
                Ok(DefaultValue::Null),
                Ok(DefaultValue::Boolean(true)),
                Ok(DefaultValue::Sequence(vec![
                    DefaultValue::Integer(1),
                    DefaultValue::Sequence(vec![DefaultValue::Integer(2), DefaultValue::Integer(3)]),
                ])),
                Ok(DefaultValue::Mapping(vec![(
                    "k".to_owned(),
                    DefaultValue::Mapping(vec![("1".to_owned(), DefaultValue::Boolean(false))]),
                )])),
            ]
        );
    }

    #[test]
    fn test_unsupported_defaults_keep_source_text() {
        let defaults = defaults_of("def f(a=os.getcwd(), b=1j, c=[x], d=99999999999999999999):\n    pass\n");
        let descriptions: Vec<String> = defaults
            .into_iter()
            .map(|default| default.expect_err("unsupported").description)
            .collect();
        assert_eq!(
            descriptions,
            vec!["os.getcwd()", "1j", "x", "99999999999999999999"]
        );
    }

    #[test]
    fn test_most_negative_integer() {
        let defaults = defaults_of("def f(a=-9223372036854775808):\n    pass\n");
        assert_eq!(defaults, vec![Ok(DefaultValue::Integer(i64::MIN))]);
    }

    #[test]
    fn test_parameter_order_and_varargs() -> Result<()> {
        let functions = parse_functions("def f(a, /, b, *args, c=1, **kwargs):\n    pass\n")
            .map_err(anyhow::Error::msg)?;
        let names: Vec<&str> = functions[0]
            .parameters
            .iter()
            .map(|param| param.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "args", "c", "kwargs"]);
        Ok(())
    }

    #[test]
    fn test_only_top_level_definitions() -> Result<()> {
        let source = "\
import os
from x import imported

def first():
    def nested():
        pass

class Thing:
    def method(self):
        pass

async def second():
    pass

def first(a):
    pass
";
        let functions = parse_functions(source).map_err(anyhow::Error::msg)?;
        let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(functions[0].parameters.len(), 1);
        Ok(())
    }

    #[test]
    fn test_docstrings_are_cleaned() -> Result<()> {
        let source = "def f():\n    \"\"\"Summary.\n\n    Parameters\n    ----------\n    ``a`` :\n        First.\n    \"\"\"\n\ndef g():\n    return 1\n";
        let functions = parse_functions(source).map_err(anyhow::Error::msg)?;
        assert_eq!(
            functions[0].doc.as_deref(),
            Some("Summary.\n\nParameters\n----------\n``a`` :\n    First.")
        );
        assert_eq!(functions[1].doc, None);
        Ok(())
    }

    #[test]
    fn test_cleandoc() {
        assert_eq!(cleandoc("  one\n    two\n      three\n"), "one\ntwo\n  three");
        assert_eq!(cleandoc("\n\n   \n"), "");
        assert_eq!(cleandoc("x\n\ty"), "x\ny");
    }

    #[test]
    fn test_cleandoc_counts_margin_in_characters() {
        assert_eq!(
            cleandoc("Summary.\n\u{3000}\u{3000}Body line.\n\u{3000}\u{3000}  Indented.\n"),
            "Summary.\nBody line.\n  Indented."
        );
    }

    #[test]
    fn test_functions_in_module_level_blocks() -> Result<()> {
        let source = "\
import sys

try:
    from _speedups import fast
except ImportError:
    def fast(x):
        return x

if sys.version_info >= (3, 11):
    def compat(a):
        pass
else:
    def compat(a, b=None):
        pass

with open(__file__):
    def inside():
        pass

def outer():
    def nested():
        pass
";
        let functions = parse_functions(source).map_err(anyhow::Error::msg)?;
        let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["fast", "compat", "inside", "outer"]);
        assert_eq!(functions[1].parameters.len(), 2);
        Ok(())
    }

    #[test]
    fn test_syntax_error_is_reported() {
        assert!(parse_functions("def broken(:\n").is_err());
    }

    #[test]
    fn test_provider_over_tree() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("pkg/sub"))?;
        fs::write(root.join("pkg/__init__.py"), "def hidden():\n    pass\n")?;
        fs::write(root.join("pkg/sub/__init__.py"), "")?;
        fs::write(root.join("pkg/sub/leaf.py"), "def add(a, b=0):\n    return a + b\n")?;

        let provider = SourceTreeProvider::new(ModuleResolver::new_with_pythonpath(
            vec![root.to_path_buf()],
            Some(""),
        ));
        assert_eq!(provider.kind("pkg")?, ModuleKind::Package);
        assert_eq!(provider.children("pkg")?, vec!["sub"]);
        assert_eq!(provider.children("pkg.sub")?, vec!["leaf"]);
        assert_eq!(provider.kind("pkg.sub.leaf")?, ModuleKind::Leaf);
        let functions = provider.functions("pkg.sub.leaf")?;
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "add");
        assert!(provider.origin("pkg").is_some_and(|p| p.ends_with("pkg/__init__.py")));
        assert!(matches!(
            provider.kind("pkg.nope"),
            Err(GenerateError::ModuleResolution { .. })
        ));
        Ok(())
    }
}
