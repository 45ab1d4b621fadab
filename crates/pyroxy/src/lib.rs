//! Generates R wrapper packages for Python libraries.
//!
//! Each Python function found in a package tree becomes an R function that
//! forwards its call through reticulate, documented with roxygen2 comments
//! converted from the numpydoc docstring.

pub mod collector;
pub mod config;
pub mod defaults;
pub mod dirs;
pub mod docstring;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod orchestrator;
pub mod provider;
pub mod resolver;
pub mod synthesizer;
pub mod toolchain;
pub mod traverser;
pub mod types;
