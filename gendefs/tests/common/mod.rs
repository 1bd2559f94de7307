//! Shared helpers: copy the fixture tree into a scratch directory with
//! pinned modification times.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures/freebsd")
}

/// Fixed base time for pinned mtimes.
pub fn epoch() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_110_110_400)
}

pub fn set_mtime(path: &Path, at: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(at)
        .unwrap();
}

/// Copy the fixture into `dest`, creating source files in the given order
/// (or sorted order when `order` is `None`).  Every source gets the same
/// mtime so the derived header timestamp is stable.
pub fn copy_fixture(dest: &Path, order: Option<&[&str]>) {
    let fixture = fixture_dir();
    std::fs::copy(fixture.join("gendefs.toml"), dest.join("gendefs.toml")).unwrap();
    let src_dir = dest.join("src");
    std::fs::create_dir_all(&src_dir).unwrap();

    let mut names: Vec<String> = std::fs::read_dir(fixture.join("src"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    if let Some(order) = order {
        names = order.iter().map(|s| s.to_string()).collect();
    }
    for name in &names {
        let to = src_dir.join(name);
        std::fs::copy(fixture.join("src").join(name), &to).unwrap();
        set_mtime(&to, epoch());
    }
}

/// Read all five fragments from the default output location.
pub fn read_fragments(root: &Path) -> Vec<String> {
    [".sources.def", ".const.def", ".methods.def", ".types.def", ".libraries.def"]
        .iter()
        .map(|n| std::fs::read_to_string(root.join("src").join(n)).unwrap())
        .collect()
}
