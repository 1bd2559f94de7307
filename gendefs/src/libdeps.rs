//! Library list resolution for the build step.
//!
//! The libraries fragment holds bare library names, some wrapped in
//! `#if <version-symbol> <op> <number>` blocks.  This module evaluates those
//! guards against the OS version of the build host and returns the unique
//! names that apply, roughly what `unifdef -D<symbol>=<version>` followed by
//! a whitespace split would give.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::error::Error;

/// Source of the OS version value that guards are compared against.
pub trait VersionProvider {
    fn os_version(&self) -> Result<u64>;
}

/// A version known up front (tests, cross builds, `--osreldate`).
#[derive(Debug, Clone, Copy)]
pub struct FixedVersion(pub u64);

impl VersionProvider for FixedVersion {
    fn os_version(&self) -> Result<u64> {
        Ok(self.0)
    }
}

/// Queries the running kernel with `sysctl -n <oid>`.
#[derive(Debug, Clone)]
pub struct SysctlVersion {
    pub oid: String,
}

impl Default for SysctlVersion {
    fn default() -> Self {
        SysctlVersion {
            oid: "kern.osreldate".to_string(),
        }
    }
}

impl VersionProvider for SysctlVersion {
    fn os_version(&self) -> Result<u64> {
        let out = Command::new("sysctl")
            .args(["-n", &self.oid])
            .output()
            .with_context(|| format!("running sysctl -n {}", self.oid))?;
        anyhow::ensure!(
            out.status.success(),
            "sysctl -n {} failed: {}",
            self.oid,
            String::from_utf8_lossy(&out.stderr).trim()
        );
        let text = String::from_utf8_lossy(&out.stdout);
        text.trim()
            .parse()
            .with_context(|| format!("sysctl {} returned non-numeric {:?}", self.oid, text.trim()))
    }
}

/// Evaluates guard expressions for one version value.
#[derive(Debug)]
struct GuardEvaluator<'a> {
    symbol: &'a str,
    version: u64,
    term: Regex,
}

impl<'a> GuardEvaluator<'a> {
    fn new(symbol: &'a str, version: u64) -> Result<Self, Error> {
        Ok(GuardEvaluator {
            symbol,
            version,
            term: Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*([<>=!]{1,2})\s*([0-9]+)$")?,
        })
    }

    /// `a && b && !(c)` where every term compares the version symbol.
    fn eval(&self, guard: &str) -> Result<bool, Error> {
        for term in guard.split("&&") {
            if !self.eval_term(term.trim(), guard)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn eval_term(&self, term: &str, guard: &str) -> Result<bool, Error> {
        if let Some(inner) = term.strip_prefix("!(").and_then(|t| t.strip_suffix(')')) {
            return Ok(!self.eval_term(inner.trim(), guard)?);
        }
        let invalid = || Error::InvalidGuard {
            guard: guard.to_string(),
        };
        let caps = self.term.captures(term).ok_or_else(invalid)?;
        if &caps[1] != self.symbol {
            return Err(Error::UnknownGuardSymbol {
                symbol: caps[1].to_string(),
            });
        }
        let rhs: u64 = caps[3].parse().map_err(|_| invalid())?;
        let v = self.version;
        Ok(match &caps[2] {
            "<" => v < rhs,
            "<=" | "=<" => v <= rhs,
            ">" => v > rhs,
            ">=" | "=>" => v >= rhs,
            "==" | "=" => v == rhs,
            "!=" => v != rhs,
            _ => return Err(invalid()),
        })
    }
}

/// Resolve the libraries fragment text into the set of libraries to link.
pub fn resolve_libraries(
    fragment: &str,
    version_symbol: &str,
    provider: &dyn VersionProvider,
) -> Result<BTreeSet<String>> {
    let version = provider.os_version()?;
    let evaluator = GuardEvaluator::new(version_symbol, version)?;
    let mut active: Vec<bool> = Vec::new();
    let mut libs = BTreeSet::new();

    for (idx, line) in fragment.lines().enumerate() {
        let line = line.trim();
        let lineno = idx + 1;
        if let Some(expr) = line.strip_prefix("#if ") {
            let on = evaluator
                .eval(expr.trim())
                .with_context(|| format!("libraries fragment line {lineno}"))?;
            active.push(on);
        } else if line == "#endif" {
            active
                .pop()
                .ok_or(Error::UnbalancedConditional)
                .with_context(|| format!("libraries fragment line {lineno}"))?;
        } else if line.starts_with('#') {
            return Err(Error::InvalidGuard {
                guard: line.to_string(),
            })
            .with_context(|| format!("libraries fragment line {lineno}"));
        } else if active.iter().all(|on| *on) {
            libs.extend(line.split_whitespace().map(str::to_string));
        }
    }
    if !active.is_empty() {
        return Err(Error::UnterminatedConditional { open: active.len() })
            .context("libraries fragment");
    }

    debug!(version, count = libs.len(), "resolved libraries");
    Ok(libs)
}

/// Read a libraries fragment from disk and resolve it.
pub fn resolve_library_file(
    path: &Path,
    version_symbol: &str,
    provider: &dyn VersionProvider,
) -> Result<BTreeSet<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading libraries fragment {}", path.display()))?;
    resolve_libraries(&text, version_symbol, provider)
}
