//! Staleness check — decides whether the fragments must be regenerated.
//!
//! The generator is all-or-nothing: if any single output is missing,
//! unreadable or older than the newest input, every output is rebuilt.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

/// Why an output was judged out of date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// The output does not exist or its metadata cannot be read.
    Missing,
    /// The output is strictly older than the newest input.
    Outdated,
}

/// Result of checking all outputs against all inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    /// The first stale output found, in the order the outputs were given.
    Stale { output: PathBuf, reason: StaleReason },
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale { .. })
    }
}

/// Newest modification time among `inputs`, or `None` if there are none.
/// An input that cannot be stat'ed is a hard error.
pub fn newest_mtime(inputs: &[PathBuf]) -> Result<Option<SystemTime>> {
    let mut newest = None;
    for input in inputs {
        let mtime = std::fs::metadata(input)
            .and_then(|m| m.modified())
            .with_context(|| format!("reading modification time of {}", input.display()))?;
        newest = newest.max(Some(mtime));
    }
    Ok(newest)
}

/// Check one output against the newest input time.
pub fn output_state(output: &Path, newest_input: Option<SystemTime>) -> Option<StaleReason> {
    let mtime = match std::fs::metadata(output).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return Some(StaleReason::Missing),
    };
    // An unreadable output cannot be trusted either.
    if std::fs::File::open(output).is_err() {
        return Some(StaleReason::Missing);
    }
    match newest_input {
        Some(newest) if mtime < newest => Some(StaleReason::Outdated),
        _ => None,
    }
}

/// Compare every output with the newest input.
pub fn check(inputs: &[PathBuf], outputs: &[PathBuf]) -> Result<Staleness> {
    let newest = newest_mtime(inputs)?;
    for output in outputs {
        if let Some(reason) = output_state(output, newest) {
            debug!(output = %output.display(), ?reason, "output is stale");
            return Ok(Staleness::Stale {
                output: output.clone(),
                reason,
            });
        }
    }
    Ok(Staleness::Fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(path: &Path, at: SystemTime) {
        let f = File::options()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        f.set_modified(at).unwrap();
    }

    fn base() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn missing_output_is_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.c");
        touch(&src, base());
        let out = tmp.path().join(".const.def");

        let state = check(&[src], &[out.clone()]).unwrap();
        assert_eq!(
            state,
            Staleness::Stale {
                output: out,
                reason: StaleReason::Missing
            }
        );
    }

    #[test]
    fn older_output_is_stale_newer_is_fresh() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.c");
        let b = tmp.path().join("b.h");
        let out = tmp.path().join("out.def");
        touch(&a, base());
        touch(&b, base() + Duration::from_secs(10));

        touch(&out, base() + Duration::from_secs(5));
        let state = check(&[a.clone(), b.clone()], &[out.clone()]).unwrap();
        assert!(matches!(
            state,
            Staleness::Stale { reason: StaleReason::Outdated, .. }
        ));

        touch(&out, base() + Duration::from_secs(20));
        assert_eq!(check(&[a.clone(), b.clone()], &[out.clone()]).unwrap(), Staleness::Fresh);

        // Equal times are not stale: only strictly older outputs are.
        touch(&out, base() + Duration::from_secs(10));
        assert_eq!(check(&[a, b], &[out]).unwrap(), Staleness::Fresh);
    }

    #[test]
    fn one_stale_output_is_enough() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.c");
        touch(&src, base() + Duration::from_secs(10));
        let fresh = tmp.path().join("fresh.def");
        let old = tmp.path().join("old.def");
        touch(&fresh, base() + Duration::from_secs(20));
        touch(&old, base());

        let state = check(&[src], &[fresh, old.clone()]).unwrap();
        assert_eq!(
            state,
            Staleness::Stale {
                output: old,
                reason: StaleReason::Outdated
            }
        );
    }

    #[test]
    fn no_inputs_only_missing_outputs_matter() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out.def");
        touch(&out, base());
        assert_eq!(check(&[], &[out]).unwrap(), Staleness::Fresh);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_output_is_stale() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.c");
        let out = tmp.path().join(".types.def");
        touch(&src, base());
        touch(&out, base() + Duration::from_secs(60));
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still open the file; nothing to check then.
        if File::open(&out).is_ok() {
            return;
        }
        assert_eq!(
            check(&[src], &[out.clone()]).unwrap(),
            Staleness::Stale {
                output: out,
                reason: StaleReason::Missing
            }
        );
    }

    #[test]
    fn missing_input_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = check(&[tmp.path().join("gone.c")], &[]).unwrap_err();
        assert!(format!("{err:#}").contains("gone.c"));
    }
}
