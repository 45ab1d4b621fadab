use super::{FunctionInfo, ModuleProvider};
use crate::{
    error::{GenerateError, Result},
    types::{FxIndexMap, ModuleKind},
};

#[derive(Debug, Clone)]
enum Node {
    Package { children: Vec<String> },
    Leaf { functions: Vec<FunctionInfo> },
}

/// A namespace built in memory.
///
/// Registering `a.b.c` as a module also registers `a` and `a.b` as packages
/// and links each child to its parent in registration order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    nodes: FxIndexMap<String, Node>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a leaf module with its functions
    #[must_use]
    pub fn with_module(mut self, name: &str, functions: Vec<FunctionInfo>) -> Self {
        if let Some((parent, _)) = name.rsplit_once('.') {
            self.ensure_package(parent);
            self.link(parent, name);
        }
        self.nodes.insert(name.to_owned(), Node::Leaf { functions });
        self
    }

    fn ensure_package(&mut self, name: &str) {
        if !self.nodes.contains_key(name) {
            self.nodes.insert(
                name.to_owned(),
                Node::Package {
                    children: Vec::new(),
                },
            );
        }
        if let Some((parent, _)) = name.rsplit_once('.') {
            self.ensure_package(parent);
            self.link(parent, name);
        }
    }

    fn link(&mut self, parent: &str, child: &str) {
        let simple = child.rsplit('.').next().unwrap_or(child);
        if let Some(Node::Package { children }) = self.nodes.get_mut(parent)
            && !children.iter().any(|existing| existing == simple)
        {
            children.push(simple.to_owned());
        }
    }

    fn node(&self, module: &str) -> Result<&Node> {
        self.nodes
            .get(module)
            .ok_or_else(|| GenerateError::module_resolution(module, "no such module"))
    }
}

impl ModuleProvider for InMemoryProvider {
    fn kind(&self, module: &str) -> Result<ModuleKind> {
        Ok(match self.node(module)? {
            Node::Package { .. } => ModuleKind::Package,
            Node::Leaf { .. } => ModuleKind::Leaf,
        })
    }

    fn children(&self, package: &str) -> Result<Vec<String>> {
        match self.node(package)? {
            Node::Package { children } => Ok(children.clone()),
            Node::Leaf { .. } => Ok(Vec::new()),
        }
    }

    fn functions(&self, module: &str) -> Result<Vec<FunctionInfo>> {
        match self.node(module)? {
            Node::Leaf { functions } => Ok(functions.clone()),
            Node::Package { .. } => Ok(Vec::new()),
        }
    }
}
