use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use log::{LevelFilter, debug, info};
use pyroxy::{
    config::Config, orchestrator, provider::ModuleProvider, provider::SourceTreeProvider,
    toolchain::RscriptToolchain,
};
use ruff_python_stdlib::identifiers::is_identifier;

#[derive(Parser, Debug)]
#[command(
    name = "pyroxy",
    version,
    about = "Generate an R package that wraps a Python package through reticulate"
)]
struct Cli {
    /// Dotted name of the Python package or module to wrap
    module: String,

    /// Directory of the R package to create
    output: PathBuf,

    /// Directory to search for the Python package (repeatable, searched before PYTHONPATH)
    #[arg(long = "src", value_name = "DIR")]
    src: Vec<PathBuf>,

    /// Accept an existing output directory and regenerate its R/ sources
    #[arg(long)]
    overwrite: bool,

    /// Keep the root package as a directory level under R/
    #[arg(long)]
    include_top_level: bool,

    /// Visit sub-modules in lexicographic order
    #[arg(long)]
    sort_modules: bool,

    /// Leave out functions whose defaults have no R literal instead of failing
    #[arg(long)]
    skip_unsupported: bool,

    /// Only write the R sources; do not call usethis or devtools
    #[arg(long)]
    no_toolchain: bool,

    /// Rscript executable
    #[arg(long, value_name = "PATH")]
    rscript: Option<PathBuf>,

    /// Additional configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Flags override every configuration source
    fn apply_to(&self, config: &mut Config) {
        if !self.src.is_empty() {
            config.src.clone_from(&self.src);
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if self.include_top_level {
            config.exclude_top_level = false;
        }
        if self.sort_modules {
            config.sort_modules = true;
        }
        if self.skip_unsupported {
            config.skip_unsupported_defaults = true;
        }
        if self.no_toolchain {
            config.run_toolchain = false;
        }
        if let Some(rscript) = &self.rscript {
            config.rscript.clone_from(rscript);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_to(&mut config);
    debug!("Effective configuration: {config:?}");

    if !cli.module.split('.').all(is_identifier) {
        bail!("`{}` is not a valid Python module name", cli.module);
    }
    if cli.output.exists() && !config.overwrite {
        bail!(
            "The output directory {} already exists; pass --overwrite to replace it",
            cli.output.display()
        );
    }

    let provider = SourceTreeProvider::from_roots(config.src.clone());
    provider
        .kind(&cli.module)
        .with_context(|| format!("The Python module `{}` could not be found", cli.module))?;

    let mut toolchain = RscriptToolchain::new(&config.rscript);
    let summary = orchestrator::run(&provider, &mut toolchain, &cli.module, &cli.output, &config)?;

    info!(
        "R package {} {}: {} file(s) written, {} kept",
        summary.metadata.name,
        summary.metadata.version,
        summary.report.written.len(),
        summary.report.conflicts.len()
    );
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}
