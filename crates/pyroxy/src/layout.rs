//! Maps dotted module names onto the `R/` directory of the output package
//! and writes one file per leaf module.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    error::{GenerateError, OutputConflict, Result},
    metadata::PackageMetadata,
    toolchain::RToolchain,
    types::ModuleMap,
};

/// Directory of the R package holding the generated sources
pub const R_DIR: &str = "R";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Root of the R package
    pub output_root: PathBuf,
    /// Drop the first dotted segment when building directories
    pub exclude_top_level: bool,
    /// Remove the previously generated `R/` directory and rewrite every file
    pub overwrite: bool,
    /// Call the R toolchain before and after writing files
    pub run_toolchain: bool,
}

impl LayoutOptions {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            exclude_top_level: true,
            overwrite: false,
            run_toolchain: true,
        }
    }
}

/// One file of the output tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Module the file was generated from
    pub module: String,
    /// Absolute (or output-root relative) file path
    pub path: PathBuf,
    pub contents: String,
}

/// Outcome of [`materialize`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Files written, in map order
    pub written: Vec<PathBuf>,
    /// Files left untouched because they exist and overwrite is off
    pub conflicts: Vec<OutputConflict>,
}

/// Path of a module's file, relative to the package root.
///
/// `pkg.sub.leaf` becomes `R/sub/leaf.R` with `exclude_top_level`, and
/// `R/pkg/sub/leaf.R` without. The leaf segment is never dropped.
pub fn relative_path(module: &str, exclude_top_level: bool) -> PathBuf {
    let segments: Vec<&str> = module.split('.').collect();
    let (leaf, parents) = segments
        .split_last()
        .map_or((module, &[][..]), |(leaf, parents)| (*leaf, parents));
    let start = usize::from(exclude_top_level).min(parents.len());

    let mut path = PathBuf::from(R_DIR);
    for segment in &parents[start..] {
        path.push(segment);
    }
    path.push(format!("{leaf}.R"));
    path
}

/// Wrappers separated by a blank line, with a trailing newline
pub fn file_contents(wrappers: &[String]) -> String {
    if wrappers.is_empty() {
        return String::new();
    }
    let mut contents = wrappers.join("\n\n");
    contents.push('\n');
    contents
}

/// Compute every file of the output tree without touching the disk
pub fn plan_files(map: &ModuleMap, options: &LayoutOptions) -> Vec<GeneratedFile> {
    map.iter()
        .map(|(module, wrappers)| GeneratedFile {
            module: module.clone(),
            path: options
                .output_root
                .join(relative_path(module, options.exclude_top_level)),
            contents: file_contents(wrappers),
        })
        .collect()
}

/// Create the package skeleton, write the planned files, then rebuild the
/// documentation.
///
/// With `overwrite`, the `R/` directory is removed first so wrappers of
/// modules that no longer exist do not survive the run.
pub fn materialize<T: RToolchain + ?Sized>(
    map: ModuleMap,
    metadata: &PackageMetadata,
    options: &LayoutOptions,
    toolchain: &mut T,
) -> Result<MaterializeReport> {
    if options.overwrite {
        remove_generated_sources(&options.output_root)?;
    }
    if options.run_toolchain {
        toolchain.create_package_skeleton(&options.output_root, metadata)?;
    }

    let mut report = MaterializeReport::default();
    for file in plan_files(&map, options) {
        if let Some(parent) = file.path.parent()
            && (!parent.exists() || options.overwrite)
        {
            fs::create_dir_all(parent).map_err(|e| GenerateError::io(parent, e))?;
        }

        if file.path.exists() && !options.overwrite {
            debug!("Keeping existing {}", file.path.display());
            report.conflicts.push(OutputConflict { path: file.path });
            continue;
        }
        write_file(&file.path, &file.contents)?;
        debug!("Wrote {} for {}", file.path.display(), file.module);
        report.written.push(file.path);
    }
    info!(
        "Wrote {} file(s), kept {} existing",
        report.written.len(),
        report.conflicts.len()
    );

    if options.run_toolchain {
        toolchain.rebuild_documentation(&options.output_root)?;
    }
    Ok(report)
}

fn remove_generated_sources(output_root: &Path) -> Result<()> {
    let r_dir = output_root.join(R_DIR);
    if r_dir.is_dir() {
        info!("Removing previously generated {}", r_dir.display());
        fs::remove_dir_all(&r_dir).map_err(|e| GenerateError::io(&r_dir, e))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| GenerateError::io(path, e))
}
