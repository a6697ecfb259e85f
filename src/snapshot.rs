//! Version tables and their on-disk `name: version` form

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed snapshot line {line}: {content:?}")]
    Malformed { line: usize, content: String },

    #[error("Failed to write snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Mapping of target name to its known version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTable {
    entries: HashMap<String, String>,
}

impl VersionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Record a version, returning the previous one
    pub fn insert(&mut self, name: &str, version: &str) -> Option<String> {
        self.entries.insert(name.to_string(), version.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries in snapshot order.
    ///
    /// Sorted by the name with every non-alphanumeric character removed, then
    /// by version, so `sort`/`comm` style tooling sees a stable order. The
    /// full name breaks the remaining ties.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut items: Vec<_> = self.iter().collect();
        items.sort_by_cached_key(|(name, version)| (sort_key(name), *version, *name));
        items
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VersionTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn sort_key(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Parse snapshot text. Any blank or malformed line fails the whole input.
pub fn parse_snapshot(content: &str) -> Result<VersionTable, SnapshotError> {
    let mut table = VersionTable::new();

    for (idx, line) in content.lines().enumerate() {
        let malformed = || SnapshotError::Malformed {
            line: idx + 1,
            content: line.to_string(),
        };
        let (name, version) = line.split_once(':').ok_or_else(malformed)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(malformed());
        }
        table.insert(name, version.trim());
    }

    Ok(table)
}

/// Read a snapshot file
pub fn load_snapshot(path: &Path) -> Result<VersionTable, SnapshotError> {
    let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_snapshot(&content)?;
    debug!("Loaded {} versions from {}", table.len(), path.display());
    Ok(table)
}

/// Render a table as snapshot text
pub fn render_snapshot(table: &VersionTable) -> String {
    table
        .sorted()
        .into_iter()
        .map(|(name, version)| format!("{name}: {version}\n"))
        .collect()
}

/// Persists the current table at the end of a run
#[derive(Debug, Clone, Default)]
pub struct SnapshotWriter {
    destination: Option<PathBuf>,
}

impl SnapshotWriter {
    pub fn new(destination: Option<PathBuf>) -> Self {
        Self { destination }
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// Write the table through a temporary file renamed into place.
    ///
    /// Without a destination this does nothing.
    pub fn write(&self, table: &VersionTable) -> Result<(), SnapshotError> {
        let Some(path) = self.destination.as_deref() else {
            return Ok(());
        };
        let write_err = |source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
        file.write_all(render_snapshot(table).as_bytes())
            .map_err(write_err)?;
        file.as_file().sync_all().map_err(write_err)?;
        file.persist(path).map_err(|e| write_err(e.error))?;

        debug!("Wrote {} versions to {}", table.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn parse_snapshot_trims_both_sides_and_splits_on_first_colon() {
        let table = parse_snapshot("foo : 1.0\n  bar:2:rc1  \n").unwrap();

        assert_eq!(table.get("foo"), Some("1.0"));
        assert_eq!(table.get("bar"), Some("2:rc1"));
        assert_eq!(table.len(), 2);
    }

    #[rstest]
    #[case("foo: 1.0\n\nbar: 2.0\n", 2)]
    #[case("foo 1.0\n", 1)]
    #[case("foo: 1\n : 2\n", 2)]
    fn parse_snapshot_rejects_malformed_lines(#[case] content: &str, #[case] line: usize) {
        let err = parse_snapshot(content).unwrap_err();

        assert!(matches!(err, SnapshotError::Malformed { line: l, .. } if l == line));
    }

    #[test]
    fn parse_snapshot_accepts_empty_input() {
        assert!(parse_snapshot("").unwrap().is_empty());
    }

    #[test]
    fn render_snapshot_sorts_by_alphanumeric_name_then_version() {
        let table: VersionTable = [
            ("python-zope", "4.0"),
            ("python_requests", "2.31"),
            ("Zsh", "5.9"),
            ("a-b", "2.0"),
            ("ab", "1.0"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            render_snapshot(&table),
            "Zsh: 5.9\nab: 1.0\na-b: 2.0\npython_requests: 2.31\npython-zope: 4.0\n"
        );
    }

    #[test]
    fn render_snapshot_is_byte_identical_across_writes() {
        let forward: VersionTable = (0..50).map(|i| (format!("pkg-{i}"), format!("{i}.0"))).collect();
        let backward: VersionTable = (0..50)
            .rev()
            .map(|i| (format!("pkg-{i}"), format!("{i}.0")))
            .collect();

        assert_eq!(forward, backward);
        assert_eq!(render_snapshot(&forward), render_snapshot(&backward));
        assert_eq!(
            render_snapshot(&forward).lines().next(),
            Some("pkg-0: 0.0")
        );
    }

    #[test]
    fn writer_round_trips_through_load_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new_ver.txt");
        let table: VersionTable = [("foo", "1.1"), ("bar-baz", "v2.0.0"), ("qux", "2024.01")]
            .into_iter()
            .collect();

        let writer = SnapshotWriter::new(Some(path.clone()));
        writer.write(&table).unwrap();
        let first = std::fs::read(&path).unwrap();
        writer.write(&table).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(load_snapshot(&path).unwrap(), table);
    }

    #[test]
    fn writer_without_destination_is_a_no_op() {
        let table: VersionTable = [("foo", "1.0")].into_iter().collect();

        assert!(SnapshotWriter::new(None).write(&table).is_ok());
    }

    #[test]
    fn load_snapshot_reports_missing_file() {
        let dir = TempDir::new().unwrap();

        let result = load_snapshot(&dir.path().join("missing.txt"));

        assert!(matches!(result, Err(SnapshotError::Read { .. })));
    }
}
