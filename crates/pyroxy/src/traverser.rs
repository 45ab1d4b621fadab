//! Pre-order walk of a Python namespace, producing the wrappers of every leaf module.

use log::{debug, info, warn};

use crate::{
    collector::{self, UnsupportedDefaultPolicy},
    error::Result,
    provider::ModuleProvider,
    synthesizer::{self, SynthesizeOptions},
    types::{ModuleKind, ModuleMap},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraverseOptions {
    /// Children whose simple name starts with this are skipped
    pub internal_prefix: String,
    /// Children whose dotted name contains one of these segments are skipped
    pub excluded_segments: Vec<String>,
    /// Visit children in lexicographic order instead of provider order
    pub sort_children: bool,
    pub unsupported_defaults: UnsupportedDefaultPolicy,
    pub synthesize: SynthesizeOptions,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self {
            internal_prefix: "__".to_owned(),
            excluded_segments: vec!["tests".to_owned()],
            sort_children: false,
            unsupported_defaults: UnsupportedDefaultPolicy::default(),
            synthesize: SynthesizeOptions::default(),
        }
    }
}

impl TraverseOptions {
    /// Whether the child `simple_name` of a package, with dotted name
    /// `qualified`, is left out of the walk
    pub fn is_excluded(&self, simple_name: &str, qualified: &str) -> bool {
        (!self.internal_prefix.is_empty() && simple_name.starts_with(&self.internal_prefix))
            || qualified
                .split('.')
                .any(|segment| self.excluded_segments.iter().any(|ex| ex == segment))
    }
}

/// Walk the namespace rooted at `root`.
///
/// Every visited leaf module gets an entry, in visit order, even when it
/// defines no functions. A module visited twice keeps its latest wrappers.
pub fn traverse<P: ModuleProvider + ?Sized>(
    provider: &P,
    root: &str,
    options: &TraverseOptions,
) -> Result<ModuleMap> {
    let mut map = ModuleMap::default();
    visit(provider, root, 0, options, &mut map)?;
    info!("Traversed {root}: {} leaf module(s)", map.len());
    Ok(map)
}

fn visit<P: ModuleProvider + ?Sized>(
    provider: &P,
    module: &str,
    depth: usize,
    options: &TraverseOptions,
    map: &mut ModuleMap,
) -> Result<()> {
    debug!("Working on {module} at level {depth}");
    match provider.kind(module)? {
        ModuleKind::Leaf => {
            let wrappers = leaf_wrappers(provider, module, options)?;
            map.insert(module.to_owned(), wrappers);
        }
        ModuleKind::Package => {
            let mut children = provider.children(module)?;
            if options.sort_children {
                children.sort();
            }
            for child in children {
                let qualified = format!("{module}.{child}");
                if options.is_excluded(&child, &qualified) {
                    debug!("Skipping excluded module {qualified}");
                    continue;
                }
                visit(provider, &qualified, depth + 1, options, map)?;
            }
        }
    }
    Ok(())
}

fn leaf_wrappers<P: ModuleProvider + ?Sized>(
    provider: &P,
    module: &str,
    options: &TraverseOptions,
) -> Result<Vec<String>> {
    let symbols = collector::collect_symbols(provider, module, options.unsupported_defaults)?;
    let mut wrappers = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        match synthesizer::synthesize(symbol, &options.synthesize) {
            Ok(wrapper) => wrappers.push(wrapper),
            Err(err)
                if options.unsupported_defaults == UnsupportedDefaultPolicy::Skip
                    && err.is_symbol_scoped() =>
            {
                warn!("Skipping {}: {err}", symbol.qualified_name());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(wrappers)
}
