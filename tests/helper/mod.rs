#![allow(dead_code)]

mod fetcher;

pub use fetcher::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// Write `content` to `name` inside `dir`
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}
