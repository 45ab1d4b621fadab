use std::{
    cell::RefCell,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexSet;
use log::{debug, warn};
use ruff_python_stdlib::identifiers::is_identifier;

use crate::{
    error::{GenerateError, Result},
    types::{FxIndexMap, ModuleKind},
};

/// A scoped guard for safely setting and cleaning up the PYTHONPATH environment variable.
///
/// The original value is restored when the guard is dropped, even if a panic
/// occurs during testing.
///
/// # Example
///
/// ```rust
/// use pyroxy::resolver::PythonPathGuard;
/// let _guard = PythonPathGuard::new("/tmp/test");
/// // PYTHONPATH is now set to "/tmp/test"
/// ```
#[derive(Debug)]
#[must_use = "PythonPathGuard must be held in scope to ensure cleanup"]
pub struct PythonPathGuard {
    /// The original value of PYTHONPATH, None if it was not set
    original_value: Option<String>,
}

impl PythonPathGuard {
    /// Set PYTHONPATH to `new_value` until the guard is dropped
    pub fn new(new_value: &str) -> Self {
        let original_value = std::env::var("PYTHONPATH").ok();

        // SAFETY: only used from serialized tests, restored on drop
        unsafe {
            std::env::set_var("PYTHONPATH", new_value);
        }

        Self { original_value }
    }
}

impl Drop for PythonPathGuard {
    fn drop(&mut self) {
        #[allow(clippy::disallowed_methods)]
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            // SAFETY: restoring the environment to its original state
            unsafe {
                match self.original_value.take() {
                    Some(original) => std::env::set_var("PYTHONPATH", original),
                    None => std::env::remove_var("PYTHONPATH"),
                }
            }
        }));
    }
}

/// Where a dotted module name lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLocation {
    /// `pkg/__init__.py`
    Package { dir: PathBuf, init: PathBuf },
    /// A directory without `__init__.py`; may span several search directories
    NamespacePackage { dirs: Vec<PathBuf> },
    /// `module.py`
    Module { file: PathBuf },
}

impl ModuleLocation {
    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::Package { .. } | Self::NamespacePackage { .. } => ModuleKind::Package,
            Self::Module { .. } => ModuleKind::Leaf,
        }
    }

    /// The file whose statements define the module, if there is one
    pub fn source_file(&self) -> Option<&Path> {
        match self {
            Self::Package { init, .. } => Some(init),
            Self::Module { file } => Some(file),
            Self::NamespacePackage { .. } => None,
        }
    }

    /// Directories searched for children (the package `__path__`)
    pub fn search_path(&self) -> Vec<PathBuf> {
        match self {
            Self::Package { dir, .. } => vec![dir.clone()],
            Self::NamespacePackage { dirs } => dirs.clone(),
            Self::Module { .. } => Vec::new(),
        }
    }
}

/// Locates Python modules under the configured source roots and `PYTHONPATH`
#[derive(Debug)]
pub struct ModuleResolver {
    src: Vec<PathBuf>,
    /// PYTHONPATH override for testing
    pythonpath_override: Option<String>,
    /// Cache of resolved locations, negative results included
    cache: RefCell<FxIndexMap<String, Option<ModuleLocation>>>,
}

impl ModuleResolver {
    pub fn new(src: Vec<PathBuf>) -> Self {
        Self::new_with_pythonpath(src, None)
    }

    /// Create a resolver with an explicit PYTHONPATH instead of the environment
    pub fn new_with_pythonpath(src: Vec<PathBuf>, pythonpath_override: Option<&str>) -> Self {
        Self {
            src,
            pythonpath_override: pythonpath_override.map(str::to_owned),
            cache: RefCell::new(FxIndexMap::default()),
        }
    }

    /// All directories to search, configured roots first, deduplicated
    pub fn search_directories(&self) -> Vec<PathBuf> {
        let mut unique_dirs = IndexSet::new();

        for dir in &self.src {
            unique_dirs.insert(canonicalize_path(dir));
        }

        let pythonpath = self
            .pythonpath_override
            .clone()
            .or_else(|| std::env::var("PYTHONPATH").ok());
        if let Some(pythonpath) = pythonpath {
            for path in std::env::split_paths(&pythonpath) {
                if path.as_os_str().is_empty() || !path.is_dir() {
                    continue;
                }
                unique_dirs.insert(canonicalize_path(&path));
            }
        }

        unique_dirs.into_iter().collect()
    }

    /// Resolve a dotted module name.
    ///
    /// For the final segment a package (`foo/__init__.py`) wins over a module
    /// file (`foo.py`), which wins over a namespace directory (`foo/`).
    pub fn resolve(&self, module_name: &str) -> Option<ModuleLocation> {
        if let Some(cached) = self.cache.borrow().get(module_name) {
            return cached.clone();
        }

        let parts: Vec<&str> = module_name.split('.').collect();
        let mut namespace_dirs = Vec::new();
        let mut found = None;
        for search_dir in self.search_directories() {
            match resolve_in_directory(&search_dir, &parts) {
                Some(ModuleLocation::NamespacePackage { dirs }) => namespace_dirs.extend(dirs),
                // A regular package or module anywhere on the path beats namespace portions
                Some(location) => {
                    found = Some(location);
                    break;
                }
                None => {}
            }
        }
        if found.is_none() && !namespace_dirs.is_empty() {
            found = Some(ModuleLocation::NamespacePackage {
                dirs: namespace_dirs,
            });
        }

        debug!("Resolved {module_name} to {found:?}");
        self.cache
            .borrow_mut()
            .insert(module_name.to_owned(), found.clone());
        found
    }

    /// Simple names of the direct children of a package, in `pkgutil` order:
    /// each search directory's sorted listing, first occurrence of a name wins
    pub fn children(&self, location: &ModuleLocation) -> Result<Vec<String>> {
        let mut yielded = IndexSet::new();
        for dir in location.search_path() {
            let entries = fs::read_dir(&dir).map_err(|e| GenerateError::io(&dir, e))?;
            let mut names = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| GenerateError::io(&dir, e))?;
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_owned());
                } else {
                    warn!("Skipping non UTF-8 entry in {}", dir.display());
                }
            }
            names.sort();

            for name in names {
                let path = dir.join(&name);
                let module_name = if path.is_dir() {
                    if name.contains('.') || !path.join("__init__.py").is_file() {
                        continue;
                    }
                    name
                } else if path.extension() == Some(OsStr::new("py")) {
                    match path.file_stem().and_then(OsStr::to_str) {
                        Some(stem) if stem != "__init__" && !stem.contains('.') => stem.to_owned(),
                        _ => continue,
                    }
                } else {
                    continue;
                };
                if !is_identifier(&module_name) {
                    debug!("Skipping {}: not an importable name", path.display());
                    continue;
                }
                yielded.insert(module_name);
            }
        }
        Ok(yielded.into_iter().collect())
    }
}

fn resolve_in_directory(root: &Path, parts: &[&str]) -> Option<ModuleLocation> {
    let (last, parents) = parts.split_last()?;
    let mut current_path = root.to_path_buf();
    for part in parents {
        let package_dir = current_path.join(part);
        if !package_dir.is_dir() {
            return None;
        }
        current_path = package_dir;
    }

    let package_dir = current_path.join(last);
    let package_init = package_dir.join("__init__.py");
    if package_init.is_file() {
        return Some(ModuleLocation::Package {
            dir: package_dir,
            init: package_init,
        });
    }

    let module_file = current_path.join(format!("{last}.py"));
    if module_file.is_file() {
        return Some(ModuleLocation::Module { file: module_file });
    }

    if package_dir.is_dir() {
        return Some(ModuleLocation::NamespacePackage {
            dirs: vec![package_dir],
        });
    }
    None
}

/// Canonicalize a path, falling back to the original on failure
fn canonicalize_path(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(e) => {
            warn!("Failed to canonicalize path {}: {}", path.display(), e);
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    fn create_test_file(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    #[test]
    fn test_package_preferred_over_module() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("foo/__init__.py"), "# Package")?;
        create_test_file(&root.join("foo.py"), "# Module")?;

        let resolver = ModuleResolver::new_with_pythonpath(vec![root.to_path_buf()], Some(""));
        let location = resolver.resolve("foo").expect("foo resolves");
        assert_eq!(location.kind(), ModuleKind::Package);
        assert_eq!(
            location.source_file().map(Path::to_path_buf),
            Some(root.canonicalize()?.join("foo/__init__.py"))
        );
        Ok(())
    }

    #[test]
    fn test_nested_module_resolution() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("myapp/__init__.py"), "")?;
        create_test_file(&root.join("myapp/utils/__init__.py"), "")?;
        create_test_file(&root.join("myapp/utils/helpers.py"), "")?;

        let resolver = ModuleResolver::new_with_pythonpath(vec![root.to_path_buf()], Some(""));
        assert_eq!(
            resolver.resolve("myapp.utils").map(|l| l.kind()),
            Some(ModuleKind::Package)
        );
        assert_eq!(
            resolver.resolve("myapp.utils.helpers").map(|l| l.kind()),
            Some(ModuleKind::Leaf)
        );
        assert_eq!(resolver.resolve("myapp.missing"), None);
        Ok(())
    }

    #[test]
    fn test_namespace_package() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("ns/inner/__init__.py"), "")?;

        let resolver = ModuleResolver::new_with_pythonpath(vec![root.to_path_buf()], Some(""));
        let location = resolver.resolve("ns").expect("namespace resolves");
        assert!(matches!(location, ModuleLocation::NamespacePackage { .. }));
        assert_eq!(location.source_file(), None);
        assert_eq!(resolver.children(&location)?, vec!["inner"]);
        Ok(())
    }

    #[test]
    fn test_children_follow_pkgutil_rules() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("pkg/__init__.py"), "")?;
        create_test_file(&root.join("pkg/zeta.py"), "")?;
        create_test_file(&root.join("pkg/alpha.py"), "")?;
        create_test_file(&root.join("pkg/sub/__init__.py"), "")?;
        create_test_file(&root.join("pkg/sub.py"), "")?;
        create_test_file(&root.join("pkg/data/readme.txt"), "")?;
        create_test_file(&root.join("pkg/notes.txt"), "")?;
        create_test_file(&root.join("pkg/not-a-name.py"), "")?;
        create_test_file(&root.join("pkg/__main__.py"), "")?;

        let resolver = ModuleResolver::new_with_pythonpath(vec![root.to_path_buf()], Some(""));
        let location = resolver.resolve("pkg").expect("pkg resolves");
        assert_eq!(
            resolver.children(&location)?,
            vec!["__main__", "alpha", "sub", "zeta"]
        );
        Ok(())
    }

    #[test]
    fn test_configured_roots_come_first() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("src/helper.py"), "# configured")?;
        create_test_file(&root.join("extra/helper.py"), "# pythonpath")?;

        let extra = root.join("extra");
        let resolver = ModuleResolver::new_with_pythonpath(vec![root.join("src")], extra.to_str());
        let dirs = resolver.search_directories();
        assert_eq!(dirs.len(), 2);
        assert_eq!(dirs[0], root.join("src").canonicalize()?);

        let location = resolver.resolve("helper").expect("helper resolves");
        assert_eq!(
            location.source_file().map(Path::to_path_buf),
            Some(root.join("src").canonicalize()?.join("helper.py"))
        );
        Ok(())
    }

    #[test]
    #[serial]
    fn test_pythonpath_from_environment() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("envmod.py"), "")?;

        let path = root.to_str().expect("temp path is UTF-8");
        let _guard = PythonPathGuard::new(path);
        let resolver = ModuleResolver::new(Vec::new());
        assert_eq!(
            resolver.resolve("envmod").map(|l| l.kind()),
            Some(ModuleKind::Leaf)
        );
        Ok(())
    }

    #[test]
    #[serial]
    fn test_pythonpath_guard_restores() {
        let original = std::env::var("PYTHONPATH").ok();
        {
            let _guard = PythonPathGuard::new("/test/path");
            assert_eq!(std::env::var("PYTHONPATH").ok().as_deref(), Some("/test/path"));
        }
        assert_eq!(std::env::var("PYTHONPATH").ok(), original);
    }
}
