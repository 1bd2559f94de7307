//! Configuration types for `gendefs.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::emit::FragmentKind;

/// Root configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
}

/// Where the annotated sources live and which of them take part.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    /// Source directory, relative to the TOML file's parent directory.
    pub dir: PathBuf,
    /// Extensions of files that are scanned for markers and listed in the
    /// sources fragment.
    #[serde(default = "default_scan")]
    pub scan: Vec<String>,
    /// Extensions of files whose modification time feeds the staleness
    /// check.  Usually a superset of `scan` (headers included).
    #[serde(default = "default_depends")]
    pub depends: Vec<String>,
    /// File names skipped entirely, e.g. the module glue file that
    /// `#include`s the generated fragments.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_scan() -> Vec<String> {
    vec!["c".to_string()]
}

fn default_depends() -> Vec<String> {
    vec!["c".to_string(), "h".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec!["freebsdmodule.c".to_string()]
}

/// Output fragment settings.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory the fragments are written to.  Defaults to `source.dir`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_sources")]
    pub sources: PathBuf,
    #[serde(default = "default_constants")]
    pub constants: PathBuf,
    #[serde(default = "default_methods")]
    pub methods: PathBuf,
    #[serde(default = "default_types")]
    pub types: PathBuf,
    #[serde(default = "default_libraries")]
    pub libraries: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: None,
            sources: default_sources(),
            constants: default_constants(),
            methods: default_methods(),
            types: default_types(),
            libraries: default_libraries(),
        }
    }
}

fn default_sources() -> PathBuf {
    PathBuf::from(".sources.def")
}

fn default_constants() -> PathBuf {
    PathBuf::from(".const.def")
}

fn default_methods() -> PathBuf {
    PathBuf::from(".methods.def")
}

fn default_types() -> PathBuf {
    PathBuf::from(".types.def")
}

fn default_libraries() -> PathBuf {
    PathBuf::from(".libraries.def")
}

impl OutputConfig {
    /// File name configured for one fragment kind.
    pub fn file_name(&self, kind: FragmentKind) -> &Path {
        match kind {
            FragmentKind::Sources => &self.sources,
            FragmentKind::Constants => &self.constants,
            FragmentKind::Methods => &self.methods,
            FragmentKind::Types => &self.types,
            FragmentKind::Libraries => &self.libraries,
        }
    }
}

/// Marker spellings that vary between extension modules.
#[derive(Debug, Deserialize)]
pub struct MarkerConfig {
    /// Prefix of exported C functions (`PyFB_chflags` exports `chflags`).
    #[serde(default = "default_function_prefix")]
    pub function_prefix: String,
    /// Symbol compared against a number in tracked `#if` guards.
    #[serde(default = "default_version_symbol")]
    pub version_symbol: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        MarkerConfig {
            function_prefix: default_function_prefix(),
            version_symbol: default_version_symbol(),
        }
    }
}

fn default_function_prefix() -> String {
    "PyFB_".to_string()
}

fn default_version_symbol() -> String {
    "__FreeBSD_version".to_string()
}

impl Config {
    /// Absolute (base-relative) source directory.
    pub fn source_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.source.dir)
    }

    /// Directory that receives the fragments.
    pub fn output_dir(&self, base_dir: &Path) -> PathBuf {
        match &self.output.dir {
            Some(dir) => base_dir.join(dir),
            None => self.source_dir(base_dir),
        }
    }

    /// Paths of all five fragments, in [`FragmentKind::ALL`] order.
    pub fn output_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.output_paths_in(&self.output_dir(base_dir))
    }

    /// Fragment paths under an explicit directory, e.g. a build script's
    /// `OUT_DIR`.
    pub fn output_paths_in(&self, dir: &Path) -> Vec<PathBuf> {
        FragmentKind::ALL
            .iter()
            .map(|kind| dir.join(self.output.file_name(*kind)))
            .collect()
    }

    /// Every file that the fragments are derived from: the staleness inputs
    /// plus the scanned files, sorted and deduplicated.
    pub fn input_files(&self, base_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = self.depend_files(base_dir)?;
        files.extend(self.scan_files(base_dir)?);
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files.dedup();
        Ok(files)
    }

    /// Files to scan for markers, sorted by file name.
    pub fn scan_files(&self, base_dir: &Path) -> Result<Vec<PathBuf>> {
        self.list_sources(base_dir, &self.source.scan)
    }

    /// Files whose modification time decides staleness, sorted by file name.
    pub fn depend_files(&self, base_dir: &Path) -> Result<Vec<PathBuf>> {
        self.list_sources(base_dir, &self.source.depends)
    }

    fn list_sources(&self, base_dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
        let dir = self.source_dir(base_dir);
        let mut files = Vec::new();
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("reading source directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if self.source.exclude.iter().any(|e| e == name) {
                continue;
            }
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x == e));
            if matches_ext {
                files.push(path);
            }
        }
        // Directory order is filesystem-dependent; output must not be.
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

/// Load and parse a `gendefs.toml` configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
    parse_config(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}
