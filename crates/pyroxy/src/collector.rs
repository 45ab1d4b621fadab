//! Enumerates the convertible functions of one leaf module.

use cow_utils::CowUtils;
use log::{debug, warn};

use crate::{
    defaults::DefaultValue,
    error::{GenerateError, Result},
    provider::{FunctionInfo, ModuleProvider},
};

/// A function parameter with its classified default
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: DefaultValue,
}

/// A function ready for wrapper synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Dotted name of the defining module
    pub module: String,
    pub name: String,
    /// Normalized docstring, possibly empty
    pub doc: String,
    pub parameters: Vec<Parameter>,
}

impl Symbol {
    /// `module.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }
}

/// What to do with a function whose default has no R literal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnsupportedDefaultPolicy {
    /// Abort with [`GenerateError::UnsupportedDefaultType`]
    #[default]
    Fail,
    /// Log a warning and leave the function out
    Skip,
}

/// Collect the functions defined in `module`, ordered by name
pub fn collect_symbols<P: ModuleProvider + ?Sized>(
    provider: &P,
    module: &str,
    policy: UnsupportedDefaultPolicy,
) -> Result<Vec<Symbol>> {
    let mut functions = provider.functions(module)?;
    functions.sort_by(|a, b| a.name.cmp(&b.name));

    let mut symbols = Vec::with_capacity(functions.len());
    for function in functions {
        match to_symbol(module, function) {
            Ok(symbol) => symbols.push(symbol),
            Err(err) if policy == UnsupportedDefaultPolicy::Skip && err.is_symbol_scoped() => {
                warn!("Skipping function: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    debug!("Collected {} symbol(s) from {module}", symbols.len());
    Ok(symbols)
}

fn to_symbol(module: &str, function: FunctionInfo) -> Result<Symbol> {
    let mut parameters = Vec::with_capacity(function.parameters.len());
    for param in function.parameters {
        let default = param
            .default
            .map_err(|unsupported| GenerateError::UnsupportedDefaultType {
                symbol: format!("{module}.{}", function.name),
                parameter: param.name.clone(),
                description: unsupported.description,
            })?;
        parameters.push(Parameter {
            name: param.name,
            default,
        });
    }

    Ok(Symbol {
        module: module.to_owned(),
        name: function.name,
        doc: normalize_doc(function.doc.as_deref()),
        parameters,
    })
}

/// A missing docstring reads as `None`, then every `None` is removed
fn normalize_doc(doc: Option<&str>) -> String {
    doc.unwrap_or("None").cow_replace("None", "").into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::provider::{InMemoryProvider, ParameterInfo};

    fn function(name: &str, doc: Option<&str>, parameters: Vec<ParameterInfo>) -> FunctionInfo {
        FunctionInfo {
            name: name.to_owned(),
            doc: doc.map(str::to_owned),
            parameters,
        }
    }

    #[test]
    fn test_symbols_sorted_by_name() -> Result<()> {
        let provider = InMemoryProvider::new().with_module(
            "pkg.m",
            vec![
                function("zeta", None, Vec::new()),
                function("_private", None, Vec::new()),
                function("alpha", None, Vec::new()),
            ],
        );
        let symbols = collect_symbols(&provider, "pkg.m", UnsupportedDefaultPolicy::Fail)?;
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["_private", "alpha", "zeta"]);
        assert_eq!(symbols[1].qualified_name(), "pkg.m.alpha");
        Ok(())
    }

    #[test]
    fn test_doc_normalization() {
        assert_eq!(normalize_doc(None), "");
        assert_eq!(
            normalize_doc(Some("Returns None when empty.")),
            "Returns  when empty."
        );
        assert_eq!(normalize_doc(Some("Plain.")), "Plain.");
    }

    #[test]
    fn test_unsupported_default_fails() {
        let provider = InMemoryProvider::new().with_module(
            "m",
            vec![function(
                "f",
                None,
                vec![ParameterInfo::unsupported("path", "os.getcwd()")],
            )],
        );
        let err = collect_symbols(&provider, "m", UnsupportedDefaultPolicy::Fail)
            .expect_err("unsupported default must fail");
        match err {
            GenerateError::UnsupportedDefaultType {
                symbol,
                parameter,
                description,
            } => {
                assert_eq!(symbol, "m.f");
                assert_eq!(parameter, "path");
                assert_eq!(description, "os.getcwd()");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_default_skipped() -> Result<()> {
        let provider = InMemoryProvider::new().with_module(
            "m",
            vec![
                function("bad", None, vec![ParameterInfo::unsupported("x", "object()")]),
                function(
                    "good",
                    Some("Fine."),
                    vec![ParameterInfo::new("x", DefaultValue::Integer(1))],
                ),
            ],
        );
        let symbols = collect_symbols(&provider, "m", UnsupportedDefaultPolicy::Skip)?;
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "good");
        assert_eq!(symbols[0].doc, "Fine.");
        assert_eq!(symbols[0].parameter_names(), vec!["x"]);
        Ok(())
    }
}
