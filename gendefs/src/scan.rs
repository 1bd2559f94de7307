//! Source scanner — one sequential pass per file.
//!
//! For every line the conditional stack is updated first, then the marker
//! grammars run and each hit is emitted under the current combined guard.
//! Sources are expected to keep markers and directives on separate lines.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, trace};

use crate::cond::{ConditionalStack, DirectiveMatcher};
use crate::config::MarkerConfig;
use crate::emit::Fragments;
use crate::matcher::Matchers;

/// Per-run scanner state: compiled grammars plus reporting mode.
#[derive(Debug)]
pub struct Scanner {
    matchers: Matchers,
    directives: DirectiveMatcher,
    verbose: bool,
}

impl Scanner {
    pub fn new(markers: &MarkerConfig, verbose: bool) -> Result<Self> {
        Ok(Scanner {
            matchers: Matchers::new(markers)?,
            directives: DirectiveMatcher::new(&markers.version_symbol)?,
            verbose,
        })
    }

    /// Read and scan one source file, recording it in the sources fragment.
    /// Returns the number of markers emitted.
    pub fn scan_file(&self, path: &Path, fragments: &mut Fragments) -> Result<usize> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading source {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("source path {} has no usable file name", path.display()))?;

        if self.verbose {
            info!("scanning {}", path.display());
        } else {
            debug!(path = %path.display(), "scanning source");
        }

        fragments.add_source(file_name);
        self.scan_text(file_name, &text, fragments)
    }

    /// Scan already-loaded source text.  `file_name` is only used for
    /// diagnostics.
    pub fn scan_text(&self, file_name: &str, text: &str, fragments: &mut Fragments) -> Result<usize> {
        let mut stack = ConditionalStack::new();
        let mut emitted = 0;

        for (idx, line) in text.lines().enumerate() {
            let lineno = idx + 1;
            stack
                .update(&self.directives, line)
                .with_context(|| format!("{file_name}:{lineno}"))?;

            let found = self
                .matchers
                .match_line(line)
                .with_context(|| format!("{file_name}:{lineno}: unsupported marker"))?;
            if found.is_empty() {
                continue;
            }

            let guard = stack.combined_guard();
            for annotation in &found {
                if self.verbose {
                    info!("  {annotation}");
                } else {
                    trace!(file = file_name, line = lineno, %annotation, guard = %guard, "marker");
                }
                fragments.emit(annotation, &guard);
                emitted += 1;
            }
        }

        stack
            .finish()
            .with_context(|| format!("{file_name}: end of file"))?;
        Ok(emitted)
    }
}
