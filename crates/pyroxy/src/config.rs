//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. user config (`<config dir>/pyroxy/pyroxy.toml`)
//! 3. project config (`pyroxy.toml`, or `[tool.pyroxy]` in `pyproject.toml`)
//! 4. an explicit `--config` file
//! 5. `PYROXY_*` environment variables
//!
//! CLI flags are applied on top by the binary.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::Deserialize;

use crate::{dirs, docstring::DEFAULT_WIDTH};

/// Effective configuration for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directories searched for the root module, before `PYTHONPATH`
    pub src: Vec<PathBuf>,
    /// Replace files that already exist in the output tree
    pub overwrite: bool,
    /// Drop the root package segment when laying out files
    pub exclude_top_level: bool,
    /// Child modules whose simple name starts with this are skipped
    pub internal_prefix: String,
    /// Modules with any of these dotted segments are skipped
    pub excluded_segments: Vec<String>,
    /// Visit children in lexicographic order instead of provider order
    pub sort_modules: bool,
    /// Drop functions with unrepresentable defaults instead of failing
    pub skip_unsupported_defaults: bool,
    /// Column limit for roxygen comments
    pub wrap_width: usize,
    /// Call the R toolchain before and after writing files
    pub run_toolchain: bool,
    /// `Rscript` executable
    pub rscript: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src: Vec::new(),
            overwrite: false,
            exclude_top_level: true,
            internal_prefix: "__".to_owned(),
            excluded_segments: vec!["tests".to_owned()],
            sort_modules: false,
            skip_unsupported_defaults: false,
            wrap_width: DEFAULT_WIDTH,
            run_toolchain: true,
            rscript: PathBuf::from("Rscript"),
        }
    }
}

/// One configuration file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub src: Option<Vec<PathBuf>>,
    pub overwrite: Option<bool>,
    pub exclude_top_level: Option<bool>,
    pub internal_prefix: Option<String>,
    pub excluded_segments: Option<Vec<String>>,
    pub sort_modules: Option<bool>,
    pub skip_unsupported_defaults: Option<bool>,
    pub wrap_width: Option<usize>,
    pub run_toolchain: Option<bool>,
    pub rscript: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PyProject {
    tool: Option<PyProjectTool>,
}

#[derive(Debug, Deserialize)]
struct PyProjectTool {
    pyroxy: Option<ConfigFile>,
}

impl Config {
    /// Load configuration from every source, optionally adding an explicit file
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_file) = dirs::user_config_file()
            && user_file.is_file()
        {
            debug!("Loading user config from {}", user_file.display());
            config.merge(Self::load_from_file(&user_file)?);
        }

        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        if let Some(project) = Self::load_project_config(&cwd)? {
            config.merge(project);
        }

        if let Some(path) = config_path {
            debug!("Loading explicit config from {}", path.display());
            config.merge(Self::load_from_file(path)?);
        }

        config.apply_env_vars()?;
        Ok(config)
    }

    /// Parse a standalone `pyroxy.toml`
    pub fn load_from_file(path: &Path) -> Result<ConfigFile> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// `pyroxy.toml` wins over `[tool.pyroxy]` in `pyproject.toml`
    fn load_project_config(dir: &Path) -> Result<Option<ConfigFile>> {
        let standalone = dir.join("pyroxy.toml");
        if standalone.is_file() {
            debug!("Loading project config from {}", standalone.display());
            return Self::load_from_file(&standalone).map(Some);
        }

        let pyproject = dir.join("pyproject.toml");
        if !pyproject.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&pyproject)
            .with_context(|| format!("Failed to read {}", pyproject.display()))?;
        let parsed: PyProject = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", pyproject.display()))?;
        Ok(parsed.tool.and_then(|tool| tool.pyroxy))
    }

    /// Overlay every key present in `file`
    pub fn merge(&mut self, file: ConfigFile) {
        if let Some(src) = file.src {
            self.src = src;
        }
        if let Some(overwrite) = file.overwrite {
            self.overwrite = overwrite;
        }
        if let Some(exclude_top_level) = file.exclude_top_level {
            self.exclude_top_level = exclude_top_level;
        }
        if let Some(prefix) = file.internal_prefix {
            self.internal_prefix = prefix;
        }
        if let Some(segments) = file.excluded_segments {
            self.excluded_segments = segments;
        }
        if let Some(sort_modules) = file.sort_modules {
            self.sort_modules = sort_modules;
        }
        if let Some(skip) = file.skip_unsupported_defaults {
            self.skip_unsupported_defaults = skip;
        }
        if let Some(width) = file.wrap_width {
            self.wrap_width = width;
        }
        if let Some(run_toolchain) = file.run_toolchain {
            self.run_toolchain = run_toolchain;
        }
        if let Some(rscript) = file.rscript {
            self.rscript = rscript;
        }
    }

    fn apply_env_vars(&mut self) -> Result<()> {
        if let Ok(src) = std::env::var("PYROXY_SRC") {
            self.src = std::env::split_paths(&src)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }
        if let Ok(value) = std::env::var("PYROXY_OVERWRITE") {
            self.overwrite = parse_bool("PYROXY_OVERWRITE", &value)?;
        }
        if let Ok(value) = std::env::var("PYROXY_EXCLUDE_TOP_LEVEL") {
            self.exclude_top_level = parse_bool("PYROXY_EXCLUDE_TOP_LEVEL", &value)?;
        }
        if let Ok(rscript) = std::env::var("PYROXY_RSCRIPT") {
            self.rscript = PathBuf::from(rscript);
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("{name} must be a boolean, got `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.exclude_top_level);
        assert!(!config.overwrite);
        assert_eq!(config.internal_prefix, "__");
        assert_eq!(config.excluded_segments, vec!["tests"]);
        assert_eq!(config.wrap_width, 70);
    }

    #[test]
    fn test_merge_only_overrides_present_keys() -> Result<()> {
        let file: ConfigFile = toml::from_str("overwrite = true\nsort-modules = true\n")?;
        let mut config = Config::default();
        config.merge(file);
        assert!(config.overwrite);
        assert!(config.sort_modules);
        assert!(config.exclude_top_level);
        Ok(())
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let parsed: std::result::Result<ConfigFile, _> = toml::from_str("colour = \"blue\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_pyproject_tool_table() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join("pyproject.toml"),
            "[project]\nname = \"demo\"\n\n[tool.pyroxy]\nexclude-top-level = false\nwrap-width = 80\n",
        )?;
        let file = Config::load_project_config(temp_dir.path())?.expect("tool table present");
        let mut config = Config::default();
        config.merge(file);
        assert!(!config.exclude_top_level);
        assert_eq!(config.wrap_width, 80);
        Ok(())
    }

    #[test]
    fn test_standalone_file_wins_over_pyproject() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join("pyproject.toml"),
            "[tool.pyroxy]\noverwrite = false\n",
        )?;
        fs::write(temp_dir.path().join("pyroxy.toml"), "overwrite = true\n")?;
        let file = Config::load_project_config(temp_dir.path())?.expect("config present");
        assert_eq!(file.overwrite, Some(true));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_env_overrides() -> Result<()> {
        // SAFETY: serialized test, variables are removed before returning
        unsafe {
            std::env::set_var("PYROXY_OVERWRITE", "yes");
            std::env::set_var("PYROXY_RSCRIPT", "/opt/R/bin/Rscript");
        }
        let mut config = Config::default();
        let result = config.apply_env_vars();
        unsafe {
            std::env::remove_var("PYROXY_OVERWRITE");
            std::env::remove_var("PYROXY_RSCRIPT");
        }
        result?;
        assert!(config.overwrite);
        assert_eq!(config.rscript, PathBuf::from("/opt/R/bin/Rscript"));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_invalid_env_bool() {
        unsafe {
            std::env::set_var("PYROXY_EXCLUDE_TOP_LEVEL", "maybe");
        }
        let mut config = Config::default();
        let result = config.apply_env_vars();
        unsafe {
            std::env::remove_var("PYROXY_EXCLUDE_TOP_LEVEL");
        }
        assert!(result.is_err());
    }
}
