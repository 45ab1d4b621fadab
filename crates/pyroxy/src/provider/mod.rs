//! Reflection over a Python namespace.
//!
//! The generator never inspects Python itself. It asks a [`ModuleProvider`]
//! what kind each module is, which children a package has and which functions
//! a module defines. Two providers ship with the crate:
//!
//! - [`SourceTreeProvider`] reads `.py` files from disk and parses them
//! - [`InMemoryProvider`] is populated programmatically, mostly for tests

use std::path::PathBuf;

use crate::{defaults::DefaultValue, error::Result, types::ModuleKind};

mod memory;
mod source_tree;

pub use memory::InMemoryProvider;
pub use source_tree::SourceTreeProvider;

/// Read-only view of a Python namespace
pub trait ModuleProvider {
    /// Whether `module` is a package or a leaf module
    fn kind(&self, module: &str) -> Result<ModuleKind>;

    /// Simple names of the direct children of `package`, in provider order
    fn children(&self, package: &str) -> Result<Vec<String>>;

    /// Functions defined by `module` itself, re-exports excluded
    fn functions(&self, module: &str) -> Result<Vec<FunctionInfo>>;

    /// File the module was loaded from, when there is one
    fn origin(&self, _module: &str) -> Option<PathBuf> {
        None
    }
}

/// One function as reported by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    /// Raw docstring, `None` when the function has none
    pub doc: Option<String>,
    /// Parameters in signature order
    pub parameters: Vec<ParameterInfo>,
}

/// One parameter as reported by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    /// The classified default, or why it could not be classified
    pub default: std::result::Result<DefaultValue, UnsupportedDefault>,
}

impl ParameterInfo {
    /// A parameter with a classified default ([`DefaultValue::Absent`] for none)
    pub fn new(name: impl Into<String>, default: DefaultValue) -> Self {
        Self {
            name: name.into(),
            default: Ok(default),
        }
    }

    /// A parameter whose default has no literal form
    pub fn unsupported(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Err(UnsupportedDefault {
                description: description.into(),
            }),
        }
    }
}

/// A default value the provider could not classify
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedDefault {
    /// Source text or a short description of the value
    pub description: String,
}
