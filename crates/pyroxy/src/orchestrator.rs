//! One generation run: traverse the namespace, read the package metadata,
//! materialize the R package.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    collector::UnsupportedDefaultPolicy,
    config::Config,
    docstring::ConvertOptions,
    layout::{self, LayoutOptions, MaterializeReport},
    metadata::PackageMetadata,
    provider::ModuleProvider,
    synthesizer::SynthesizeOptions,
    toolchain::RToolchain,
    traverser::{self, TraverseOptions},
};

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Leaf modules visited
    pub modules: usize,
    /// Wrapper functions generated across all modules
    pub wrappers: usize,
    pub metadata: PackageMetadata,
    pub report: MaterializeReport,
}

impl Config {
    pub fn traverse_options(&self) -> TraverseOptions {
        TraverseOptions {
            internal_prefix: self.internal_prefix.clone(),
            excluded_segments: self.excluded_segments.clone(),
            sort_children: self.sort_modules,
            unsupported_defaults: if self.skip_unsupported_defaults {
                UnsupportedDefaultPolicy::Skip
            } else {
                UnsupportedDefaultPolicy::Fail
            },
            synthesize: SynthesizeOptions {
                convert: ConvertOptions {
                    width: self.wrap_width,
                },
            },
        }
    }

    pub fn layout_options(&self, output_root: &Path) -> LayoutOptions {
        LayoutOptions {
            output_root: output_root.to_path_buf(),
            exclude_top_level: self.exclude_top_level,
            overwrite: self.overwrite,
            run_toolchain: self.run_toolchain,
        }
    }
}

/// Generate the R package for `module` under `output_root`
pub fn run<P, T>(
    provider: &P,
    toolchain: &mut T,
    module: &str,
    output_root: &Path,
    config: &Config,
) -> Result<RunSummary>
where
    P: ModuleProvider + ?Sized,
    T: RToolchain + ?Sized,
{
    info!("Generating R wrappers for {module}");
    let map = traverser::traverse(provider, module, &config.traverse_options())
        .with_context(|| format!("Failed to traverse {module}"))?;
    let modules = map.len();
    let wrappers = map.values().map(Vec::len).sum();

    let metadata = PackageMetadata::discover(module, provider.origin(module).as_deref())
        .with_context(|| format!("Failed to read package metadata for {module}"))?;

    let report = layout::materialize(
        map,
        &metadata,
        &config.layout_options(output_root),
        toolchain,
    )
    .with_context(|| format!("Failed to write R package to {}", output_root.display()))?;

    for conflict in &report.conflicts {
        warn!("{conflict}");
    }
    info!(
        "Generated {wrappers} wrapper(s) from {modules} module(s) into {}",
        output_root.display()
    );

    Ok(RunSummary {
        modules,
        wrappers,
        metadata,
        report,
    })
}
