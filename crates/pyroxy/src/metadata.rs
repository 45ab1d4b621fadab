//! Package metadata forwarded to the R package skeleton.
//!
//! The values come from the `[project]` table of the Python package's
//! `pyproject.toml` and are normalized into plain DESCRIPTION-friendly text.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use cow_utils::CowUtils;
use log::{debug, warn};
use once_cell::sync::Lazy;
use pep508_rs::PackageName;
use regex::Regex;
use serde::Deserialize;

/// Version used when the Python package does not declare one
pub const FALLBACK_VERSION: &str = "0.0.0.9000";

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\n\t]").expect("line break pattern is valid"));
static UNSUPPORTED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^A-Za-z0-9_+\-/%.:\s!(),"'=\[\]{}<>@&?]"#)
        .expect("unsupported character pattern is valid")
});
static CODE_FENCE_LANG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"   (raw|python|r)").expect("fence language pattern is valid"));
static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[*!\[.*?\]\(.*?\)\]*(\(.*?\))*").expect("markdown image pattern is valid")
});
static SPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" +").expect("space run pattern is valid"));

/// Fields of the generated R package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// R package name: the root module with `_` replaced by `.`
    pub name: String,
    /// Normalized Python distribution name, declared to reticulate as the
    /// package's Python requirement
    pub distribution: String,
    pub title: String,
    pub version: String,
    pub description: String,
    pub license: Option<String>,
    /// `Name <email>`
    pub maintainer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PyProject {
    project: Option<ProjectTable>,
}

#[derive(Debug, Deserialize)]
struct ProjectTable {
    name: String,
    version: Option<String>,
    description: Option<String>,
    license: Option<LicenseField>,
    #[serde(default)]
    authors: Vec<Contact>,
    #[serde(default)]
    maintainers: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LicenseField {
    Expression(String),
    Table {
        text: Option<String>,
        file: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct Contact {
    name: Option<String>,
    email: Option<String>,
}

impl Contact {
    fn display(&self) -> Option<String> {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => Some(format!("{name} <{email}>")),
            (Some(name), None) => Some(name.clone()),
            (None, Some(email)) => Some(email.clone()),
            (None, None) => None,
        }
    }
}

impl PackageMetadata {
    /// Metadata derived from the module name alone
    pub fn fallback(root_module: &str) -> Self {
        let root = root_segment(root_module);
        Self {
            name: r_package_name(root),
            distribution: normalized_distribution(root),
            title: root.to_owned(),
            version: FALLBACK_VERSION.to_owned(),
            description: root.to_owned(),
            license: None,
            maintainer: None,
        }
    }

    /// Look for `pyproject.toml` in the directories above `origin` and read it,
    /// falling back to [`PackageMetadata::fallback`] when there is none
    pub fn discover(root_module: &str, origin: Option<&Path>) -> Result<Self> {
        let Some(pyproject) = origin.and_then(find_pyproject) else {
            debug!("No pyproject.toml found for {root_module}; using fallback metadata");
            return Ok(Self::fallback(root_module));
        };
        Self::from_pyproject(root_module, &pyproject)
    }

    /// Read the `[project]` table of a `pyproject.toml`
    pub fn from_pyproject(root_module: &str, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: PyProject = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let mut metadata = Self::fallback(root_module);
        let Some(project) = parsed.project else {
            warn!("{} has no [project] table; using fallback metadata", path.display());
            return Ok(metadata);
        };

        let distribution = normalized_distribution(&project.name);
        if distribution != metadata.distribution {
            debug!(
                "Distribution {distribution} differs from module {}",
                metadata.distribution
            );
        }
        metadata.distribution = distribution;
        metadata.title = normalize_field(&project.name);
        metadata.description = project
            .description
            .as_deref()
            .map(normalize_field)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| metadata.title.clone());
        if let Some(version) = project.version {
            metadata.version = normalize_field(&version);
        }
        metadata.license = project.license.and_then(|license| match license {
            LicenseField::Expression(expr) => Some(normalize_field(&expr)),
            LicenseField::Table { text: Some(text), .. } => Some(normalize_field(&text)),
            LicenseField::Table {
                text: None,
                file: Some(file),
            } => Some(format!("file {}", normalize_field(&file))),
            LicenseField::Table { .. } => None,
        });
        metadata.maintainer = project
            .maintainers
            .iter()
            .chain(&project.authors)
            .find_map(Contact::display)
            .map(|contact| normalize_field(&contact));
        Ok(metadata)
    }

    /// DESCRIPTION fields passed to the skeleton call, in a stable order
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("Package", self.name.clone()),
            ("Title", self.title.clone()),
            ("Version", self.version.clone()),
            ("Description", self.description.clone()),
        ];
        if let Some(license) = &self.license {
            fields.push(("License", license.clone()));
        }
        if let Some(maintainer) = &self.maintainer {
            fields.push(("Maintainer", maintainer.clone()));
        }
        fields.push(("Config/reticulate", self.reticulate_config()));
        fields
    }

    /// `Config/reticulate` value that lets reticulate install the wrapped
    /// distribution on first use
    pub fn reticulate_config(&self) -> String {
        format!(
            "list(packages = list(list(package = \"{}\")))",
            self.distribution
        )
    }
}

fn find_pyproject(origin: &Path) -> Option<PathBuf> {
    origin
        .ancestors()
        .skip(1)
        .map(|dir| dir.join("pyproject.toml"))
        .find(|candidate| candidate.is_file())
}

fn root_segment(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

/// R package name for a Python root module
pub fn r_package_name(module: &str) -> String {
    root_segment(module).cow_replace("_", ".").into_owned()
}

fn normalized_distribution(name: &str) -> String {
    match PackageName::new(name.to_owned()) {
        Ok(package) => package.to_string(),
        Err(err) => {
            warn!("Invalid distribution name {name:?}: {err}");
            name.to_owned()
        }
    }
}

/// Flatten free text into a single DESCRIPTION-safe line
pub fn normalize_field(text: &str) -> String {
    let text = LINE_BREAKS.replace_all(text, " ");
    let text = UNSUPPORTED_CHARS.replace_all(&text, " ");
    let text = CODE_FENCE_LANG.replace_all(&text, " ");
    let text = MARKDOWN_IMAGE.replace_all(&text, " ");
    let text = SPACE_RUN.replace_all(&text, " ");
    text.trim().to_owned()
}
