//! CLI entry point for gendefs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, LevelFilter};

use gendefs::libdeps::{FixedVersion, SysctlVersion, VersionProvider};

/// gendefs — generate definition fragments from annotated C sources.
#[derive(Parser, Debug)]
#[command(name = "gendefs", version, about)]
struct Cli {
    /// Path to the gendefs.toml configuration file.
    #[arg(default_value = "gendefs.toml")]
    config: PathBuf,

    /// Print every scanned file and recognized marker.
    #[arg(short, long)]
    verbose: bool,

    /// Regenerate even if the fragments are up to date.
    #[arg(short, long)]
    force: bool,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the libraries to link against, one per line.
    #[arg(long)]
    libraries: bool,

    /// OS release to evaluate library guards against (default: `sysctl -n
    /// kern.osreldate`).
    #[arg(long, requires = "libraries")]
    osreldate: Option<u64>,
}

/// `--verbose` reports through `info!`, so keep gendefs at `info` or
/// chattier even when `RUST_LOG` asks for less.
fn log_filter(env: Option<EnvFilter>, verbose: bool) -> Result<EnvFilter> {
    let filter = env.unwrap_or_else(|| EnvFilter::new("gendefs=info"));
    let quiet = filter
        .max_level_hint()
        .is_none_or(|level| level < LevelFilter::INFO);
    if verbose && quiet {
        Ok(filter.add_directive("gendefs=info".parse::<Directive>()?))
    } else {
        Ok(filter)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::try_from_default_env().ok(), cli.verbose)?)
        .with_writer(std::io::stderr)
        .init();

    let timestamp = match std::env::var("SOURCE_DATE_EPOCH") {
        Ok(v) => Some(
            v.trim()
                .parse::<i64>()
                .with_context(|| format!("invalid SOURCE_DATE_EPOCH {v:?}"))?,
        ),
        Err(_) => None,
    };
    let opts = gendefs::Options {
        verbose: cli.verbose,
        force: cli.force,
        output_dir: cli.output_dir.clone(),
        timestamp,
    };

    let cfg = gendefs::config::load_config(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let base_dir = cli
        .config
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    gendefs::ensure_fresh(&cfg, &base_dir, &opts)?;

    if cli.libraries {
        let provider: Box<dyn VersionProvider> = match cli.osreldate {
            Some(v) => Box::new(FixedVersion(v)),
            None => Box::new(SysctlVersion::default()),
        };
        let libs = gendefs::libraries(&cfg, &base_dir, opts.output_dir.as_deref(), provider.as_ref())?;
        for lib in libs {
            println!("{lib}");
        }
    }
    Ok(())
}
