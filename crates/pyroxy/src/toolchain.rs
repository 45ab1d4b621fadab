//! The two calls made into the R toolchain.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info};

use crate::{
    error::{GenerateError, Result},
    metadata::PackageMetadata,
};

/// Package scaffolding and documentation rebuild, as seen by the materializer
pub trait RToolchain {
    /// Create the R package skeleton at `root`
    fn create_package_skeleton(&mut self, root: &Path, metadata: &PackageMetadata) -> Result<()>;

    /// Regenerate `NAMESPACE` and `man/` from the roxygen comments under `root`
    fn rebuild_documentation(&mut self, root: &Path) -> Result<()>;
}

/// Runs `usethis` and `devtools` through `Rscript -e`
#[derive(Debug, Clone)]
pub struct RscriptToolchain {
    rscript: PathBuf,
}

impl Default for RscriptToolchain {
    fn default() -> Self {
        Self::new("Rscript")
    }
}

impl RscriptToolchain {
    pub fn new(rscript: impl Into<PathBuf>) -> Self {
        Self {
            rscript: rscript.into(),
        }
    }

    fn run(&self, step: &'static str, expression: &str) -> Result<()> {
        debug!("Running {} -e {expression}", self.rscript.display());
        let output = Command::new(&self.rscript)
            .arg("-e")
            .arg(expression)
            .output()
            .map_err(|e| GenerateError::Toolchain {
                step,
                message: format!("failed to start {}: {e}", self.rscript.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerateError::Toolchain {
                step,
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }
        Ok(())
    }
}

impl RToolchain for RscriptToolchain {
    fn create_package_skeleton(&mut self, root: &Path, metadata: &PackageMetadata) -> Result<()> {
        info!("Creating R package skeleton {} at {}", metadata.name, root.display());
        self.run("create_package", &skeleton_expression(root, metadata))
    }

    fn rebuild_documentation(&mut self, root: &Path) -> Result<()> {
        info!("Rebuilding documentation in {}", root.display());
        self.run("document", &document_expression(root))
    }
}

/// `usethis::create_package(...)` call with the metadata as DESCRIPTION fields
pub fn skeleton_expression(root: &Path, metadata: &PackageMetadata) -> String {
    let fields: Vec<String> = metadata
        .fields()
        .into_iter()
        .map(|(key, value)| format!("{} = {}", r_string(key), r_string(&value)))
        .collect();
    format!(
        "options(needs.promptUser = FALSE); usethis::create_package({}, fields = list({}), \
         rstudio = FALSE, open = FALSE)",
        r_string(&root.to_string_lossy()),
        fields.join(", ")
    )
}

pub fn document_expression(root: &Path) -> String {
    format!(
        "options(needs.promptUser = FALSE); devtools::document({})",
        r_string(&root.to_string_lossy())
    )
}

/// Double-quoted R string literal
pub fn r_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_r_string() {
        assert_eq!(r_string("plain"), "\"plain\"");
        assert_eq!(r_string(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(r_string(r"C:\pkg"), r#""C:\\pkg""#);
    }

    #[test]
    fn test_skeleton_expression() {
        let metadata = PackageMetadata::fallback("my_pkg");
        assert_eq!(
            skeleton_expression(Path::new("/out/rpkg"), &metadata),
            "options(needs.promptUser = FALSE); usethis::create_package(\"/out/rpkg\", fields = \
             list(\"Package\" = \"my.pkg\", \"Title\" = \"my_pkg\", \"Version\" = \"0.0.0.9000\", \
             \"Description\" = \"my_pkg\", \"Config/reticulate\" = \"list(packages = \
             list(list(package = \\\"my-pkg\\\")))\"), rstudio = FALSE, open = FALSE)"
        );
    }

    #[test]
    fn test_document_expression() {
        assert_eq!(
            document_expression(Path::new("/out/rpkg")),
            "options(needs.promptUser = FALSE); devtools::document(\"/out/rpkg\")"
        );
    }

    #[test]
    fn test_missing_rscript_is_a_toolchain_error() {
        let mut toolchain = RscriptToolchain::new("/nonexistent/pyroxy-test/Rscript");
        let err = toolchain
            .rebuild_documentation(Path::new("/tmp"))
            .expect_err("binary does not exist");
        assert!(matches!(err, GenerateError::Toolchain { step: "document", .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_reported() {
        let mut toolchain = RscriptToolchain::new("false");
        let err = toolchain
            .rebuild_documentation(Path::new("/tmp"))
            .expect_err("`false` exits with status 1");
        assert!(matches!(err, GenerateError::Toolchain { step: "document", .. }));
    }
}
