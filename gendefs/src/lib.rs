//! gendefs — annotated C sources → definition fragments.
//!
//! Scans the extension's C sources for `EXPCONST`, `PyFB_*`, `DECLTYPE` and
//! `LIB_DEPENDS` markers and writes the fragments the module glue file
//! `#include`s: `.sources.def`, `.const.def`, `.methods.def`, `.types.def`
//! and `.libraries.def`.
//!
//! # Quick start
//!
//! Regenerate only when a source is newer than the fragments (suitable for
//! `build.rs`):
//!
//! ```no_run
//! use std::path::Path;
//!
//! let outcome = gendefs::run(Path::new("gendefs.toml"), &gendefs::Options::default()).unwrap();
//! println!("{outcome:?}");
//! ```
//!
//! Resolve the libraries to link against for a given OS release:
//!
//! ```no_run
//! use std::path::Path;
//! use gendefs::libdeps::FixedVersion;
//!
//! let cfg = gendefs::config::load_config(Path::new("gendefs.toml")).unwrap();
//! let libs = gendefs::libraries(&cfg, Path::new("."), None, &FixedVersion(700000)).unwrap();
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

pub mod cond;
pub mod config;
pub mod emit;
mod error;
pub mod libdeps;
pub mod matcher;
pub mod model;
pub mod scan;
pub mod stale;

pub use error::Error;

/// Per-invocation settings that are not part of `gendefs.toml`.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Report every scanned file and marker at `info` level.
    pub verbose: bool,
    /// Regenerate even when every fragment is up to date.
    pub force: bool,
    /// Write fragments here instead of the configured output directory.
    pub output_dir: Option<PathBuf>,
    /// Seconds since the epoch for the `Generated on` header (the
    /// `SOURCE_DATE_EPOCH` convention).  Defaults to the newest input's
    /// modification time, so an unchanged tree yields identical output.
    pub timestamp: Option<i64>,
}

/// What a call to [`ensure_fresh`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every fragment was newer than every input; nothing was written.
    UpToDate,
    /// The fragments were regenerated.
    Generated(Summary),
}

/// Counters for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub sources: usize,
    pub markers: usize,
    pub outputs: Vec<PathBuf>,
}

/// Load `config_path` and bring the fragments up to date.
///
/// Paths in the config are resolved against the config file's directory.
pub fn run(config_path: &Path, opts: &Options) -> Result<Outcome> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    ensure_fresh(&cfg, base_dir, opts)
}

/// Regenerate all fragments if any of them is missing or older than the
/// newest source; otherwise do nothing.  Calling this twice in a row is
/// always a no-op the second time.
pub fn ensure_fresh(cfg: &config::Config, base_dir: &Path, opts: &Options) -> Result<Outcome> {
    let inputs = cfg.input_files(base_dir)?;
    let outputs = output_paths(cfg, base_dir, opts.output_dir.as_deref());

    if !opts.force {
        match stale::check(&inputs, &outputs)? {
            stale::Staleness::Fresh => {
                debug!(outputs = outputs.len(), "fragments are up to date");
                return Ok(Outcome::UpToDate);
            }
            stale::Staleness::Stale { output, reason } => {
                info!(output = %output.display(), ?reason, "generating definition files");
            }
        }
    }

    generate_from_config(cfg, base_dir, opts).map(Outcome::Generated)
}

/// Unconditionally scan every source and publish all five fragments.
///
/// Fragments are built in memory and replaced together only after the
/// whole tree was scanned without error.
pub fn generate_from_config(
    cfg: &config::Config,
    base_dir: &Path,
    opts: &Options,
) -> Result<Summary> {
    let inputs = cfg.input_files(base_dir)?;
    let sources = cfg.scan_files(base_dir)?;
    let outputs = output_paths(cfg, base_dir, opts.output_dir.as_deref());

    let timestamp = header_timestamp(opts.timestamp, &inputs)?;
    let scanner = scan::Scanner::new(&cfg.markers, opts.verbose)?;
    let mut fragments = emit::Fragments::new(&cfg.markers, &timestamp);

    let mut markers = 0;
    for source in &sources {
        markers += scanner.scan_file(source, &mut fragments)?;
    }

    fragments.publish(&outputs)?;

    info!(
        sources = sources.len(),
        markers,
        dir = %outputs[0].parent().unwrap_or(Path::new(".")).display(),
        "wrote definition files"
    );

    Ok(Summary {
        sources: sources.len(),
        markers,
        outputs,
    })
}

/// Resolve the generated libraries fragment against an OS version.
///
/// `output_dir` must match the directory the fragments were generated into
/// (`None` for the configured one).
pub fn libraries(
    cfg: &config::Config,
    base_dir: &Path,
    output_dir: Option<&Path>,
    provider: &dyn libdeps::VersionProvider,
) -> Result<BTreeSet<String>> {
    let path = output_paths(cfg, base_dir, output_dir)
        .pop()
        .context("no libraries fragment configured")?;
    libdeps::resolve_library_file(&path, &cfg.markers.version_symbol, provider)
}

fn output_paths(cfg: &config::Config, base_dir: &Path, output_dir: Option<&Path>) -> Vec<PathBuf> {
    match output_dir {
        Some(dir) => cfg.output_paths_in(dir),
        None => cfg.output_paths(base_dir),
    }
}

/// `asctime`-style header time, e.g. `Sun Mar  6 12:00:00 2005`.
fn header_timestamp(epoch: Option<i64>, inputs: &[PathBuf]) -> Result<String> {
    let time: DateTime<Utc> = match epoch {
        Some(secs) => DateTime::from_timestamp(secs, 0)
            .with_context(|| format!("timestamp {secs} is out of range"))?,
        None => stale::newest_mtime(inputs)?
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .into(),
    };
    Ok(time.format("%a %b %e %H:%M:%S %Y").to_string())
}
