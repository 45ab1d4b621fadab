//! Shared type definitions for the pyroxy crate
//!
//! This module contains common types that are used across multiple components
//! of the generator, ensuring consistency and avoiding circular dependencies.

use indexmap::IndexMap;
use rustc_hash::FxHasher;

/// Type alias for FxHasher-based IndexMap
pub type FxIndexMap<K, V> = IndexMap<K, V, std::hash::BuildHasherDefault<FxHasher>>;

/// Ordered mapping from fully-qualified module name to the wrapper texts
/// generated for that module.
///
/// Insertion order is the traversal order and is what the layout step uses
/// to create directories and files.
pub type ModuleMap = FxIndexMap<String, Vec<String>>;

/// Shape of a node in the Python namespace tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// A package: has children, never contributes symbols of its own
    Package,

    /// A leaf module: holds zero or more functions and no children
    Leaf,
}

impl ModuleKind {
    /// Check if this is a leaf module
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf)
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Package => write!(f, "package"),
            Self::Leaf => write!(f, "module"),
        }
    }
}
