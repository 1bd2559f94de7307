//! Emitter — annotations → definition fragment text.
//!
//! All five fragments are accumulated in memory for the whole run and only
//! published once every source has been scanned, see [`Fragments::publish`].

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::MarkerConfig;
use crate::model::{Annotation, ConstFlag};

/// The generated files, in publication order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// `#include` line per scanned source.
    Sources,
    /// `SETDICT_*` statements for the constants submodule.
    Constants,
    /// Method table entries.
    Methods,
    /// `INITTYPE` invocations.
    Types,
    /// Raw native library names, possibly guarded.
    Libraries,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 5] = [
        FragmentKind::Sources,
        FragmentKind::Constants,
        FragmentKind::Methods,
        FragmentKind::Types,
        FragmentKind::Libraries,
    ];

    /// Whether the fragment starts with a `Generated on` comment.  The
    /// library list is read back by a token splitter, so it has none.
    pub fn has_header(self) -> bool {
        !matches!(self, FragmentKind::Libraries)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// In-memory contents of all five fragments for one generation run.
#[derive(Debug)]
pub struct Fragments {
    buffers: [String; 5],
    function_prefix: String,
    version_symbol: String,
}

impl Fragments {
    /// Start a run.  `timestamp` goes into each header comment.
    pub fn new(markers: &MarkerConfig, timestamp: &str) -> Self {
        let mut buffers: [String; 5] = Default::default();
        for kind in FragmentKind::ALL {
            if kind.has_header() {
                let _ = writeln!(buffers[kind.index()], "/* Generated on {timestamp} */");
            }
        }
        Fragments {
            buffers,
            function_prefix: markers.function_prefix.clone(),
            version_symbol: markers.version_symbol.clone(),
        }
    }

    /// Current text of one fragment.
    pub fn text(&self, kind: FragmentKind) -> &str {
        &self.buffers[kind.index()]
    }

    /// Record a scanned source file in the sources fragment.
    pub fn add_source(&mut self, file_name: &str) {
        let _ = writeln!(
            self.buffers[FragmentKind::Sources.index()],
            "#include \"{file_name}\""
        );
    }

    /// Append one annotation to its fragment, wrapped in `guard` when it is
    /// non-empty.
    pub fn emit(&mut self, annotation: &Annotation, guard: &str) {
        let kind = fragment_for(annotation);
        let entry = self.format_entry(annotation);
        let out = &mut self.buffers[kind.index()];
        if guard.is_empty() {
            out.push_str(&entry);
        } else {
            let _ = writeln!(out, "#if {guard}");
            out.push_str(&entry);
            out.push_str("#endif\n");
        }
    }

    fn format_entry(&self, annotation: &Annotation) -> String {
        let mut s = String::new();
        match annotation {
            Annotation::Const { flag, ty, name } => {
                let stmt = format!("SETDICT_{}(d, \"{name}\", {name});\n", ty.category());
                match flag {
                    ConstFlag::Always => s.push_str(&stmt),
                    ConstFlag::IfAvail => {
                        let _ = write!(s, "#ifdef {name}\n{stmt}#endif\n");
                    }
                    ConstFlag::MinOsRel(rev) => {
                        let _ = write!(s, "#if {} >= {rev}\n{stmt}#endif\n", self.version_symbol);
                    }
                    ConstFlag::MaxOsRel(rev) => {
                        let _ = write!(s, "#if {} < {rev}\n{stmt}#endif\n", self.version_symbol);
                    }
                }
            }
            Annotation::Func { name, conv } => {
                let prefix = &self.function_prefix;
                let _ = writeln!(s, "{{\"{name}\", (PyCFunction){prefix}{name}, {},", conv.tag());
                let _ = writeln!(s, " {prefix}{name}__doc__}},");
            }
            Annotation::Type {
                type_name,
                object_name,
            } => {
                let _ = writeln!(s, "INITTYPE({type_name}, {object_name})");
            }
            Annotation::LibDep { name } => {
                let _ = writeln!(s, "{name}");
            }
        }
        s
    }

    /// Write every fragment to its path.
    ///
    /// All fragments are first staged as temp files next to their targets
    /// and then renamed into place.  On failure the staged files are
    /// dropped and any target already replaced by this call is removed, so
    /// the next staleness check sees the set as missing.
    pub fn publish(self, paths: &[PathBuf]) -> Result<()> {
        anyhow::ensure!(
            paths.len() == FragmentKind::ALL.len(),
            "expected {} output paths, got {}",
            FragmentKind::ALL.len(),
            paths.len()
        );

        let mut staged = Vec::with_capacity(paths.len());
        for (text, path) in self.buffers.iter().zip(paths) {
            staged.push((stage(text, path)?, path));
        }

        let mut published: Vec<&Path> = Vec::new();
        for (tmp, path) in staged {
            if let Err(e) = tmp.persist(path) {
                for done in &published {
                    if let Err(rm) = std::fs::remove_file(done) {
                        warn!(path = %done.display(), err = %rm, "failed to remove partial output");
                    }
                }
                return Err(anyhow::Error::new(e.error)
                    .context(format!("replacing {}", path.display())));
            }
            debug!(path = %path.display(), "published fragment");
            published.push(path.as_path());
        }
        Ok(())
    }
}

fn stage(text: &str, path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("staging output in {}", dir.display()))?;
    tmp.write_all(text.as_bytes())
        .with_context(|| format!("writing staged {}", path.display()))?;
    tmp.flush()
        .with_context(|| format!("flushing staged {}", path.display()))?;
    Ok(tmp)
}

fn fragment_for(annotation: &Annotation) -> FragmentKind {
    match annotation {
        Annotation::Const { .. } => FragmentKind::Constants,
        Annotation::Func { .. } => FragmentKind::Methods,
        Annotation::Type { .. } => FragmentKind::Types,
        Annotation::LibDep { .. } => FragmentKind::Libraries,
    }
}
