//! StatusStore: flat-file persistence of per-target status records.
//!
//! Each line holds `<url> <status> <since-epoch-seconds> <failure-count>`.
//! The loader is lenient: a missing count defaults to 0 and malformed lines
//! are skipped, so a damaged file never blocks a run. Saving writes a sibling
//! temp file and renames it over the original.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sitewatch_core::{Status, StatusRecord};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Records keyed by target URL.
pub type StatusMap = BTreeMap<String, StatusRecord>;

/// Load/save capability for the full set of status records.
pub trait StatusStore: Send + Sync {
    /// Load every record. A store that was never written is empty.
    fn load(&self) -> StateResult<StatusMap>;

    /// Replace the stored records with `records`.
    fn save(&self, records: &StatusMap) -> StateResult<()>;
}

// ── File backend ───────────────────────────────────────────────────

/// Status store backed by a single text file.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    path: PathBuf,
}

impl FileStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatusStore for FileStatusStore {
    fn load(&self) -> StateResult<StatusMap> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "status file missing, starting empty");
                return Ok(StatusMap::new());
            }
            Err(e) => {
                return Err(StateError::Read(format!("{}: {e}", self.path.display())));
            }
        };
        let records = parse_records(&content);
        debug!(path = ?self.path, records = records.len(), "status file loaded");
        Ok(records)
    }

    fn save(&self, records: &StatusMap) -> StateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(map_err!(Write))?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, render_records(records)).map_err(map_err!(Write))?;
        std::fs::rename(&tmp, &self.path).map_err(map_err!(Write))?;
        debug!(path = ?self.path, records = records.len(), "status file written");
        Ok(())
    }
}

// ── In-memory backend ──────────────────────────────────────────────

/// Ephemeral store (for testing).
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: Mutex<StatusMap>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: StatusMap) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> StatusMap {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl StatusStore for MemoryStatusStore {
    fn load(&self) -> StateResult<StatusMap> {
        self.records
            .lock()
            .map(|r| r.clone())
            .map_err(map_err!(Read))
    }

    fn save(&self, records: &StatusMap) -> StateResult<()> {
        let mut guard = self.records.lock().map_err(map_err!(Write))?;
        *guard = records.clone();
        Ok(())
    }
}

// ── Line format ────────────────────────────────────────────────────

/// Parse store contents, skipping lines that cannot be interpreted.
pub fn parse_records(content: &str) -> StatusMap {
    let mut records = StatusMap::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Some((target, record)) => {
                records.insert(target, record);
            }
            None => warn!(line = lineno + 1, content = %line, "skipping malformed status line"),
        }
    }
    records
}

fn parse_line(line: &str) -> Option<(String, StatusRecord)> {
    let mut fields = line.split_whitespace();
    let target = fields.next()?;
    let status: Status = fields.next()?.parse().ok()?;
    let since: u64 = fields.next()?.parse().ok()?;
    // Older files have no fourth field.
    let failure_count: u32 = fields.next().and_then(|c| c.parse().ok()).unwrap_or(0);

    let record = match status {
        Status::Up => StatusRecord::up(since),
        Status::Down => StatusRecord::down(since, failure_count),
    };
    Some((target.to_string(), record))
}

/// Render records in the on-disk line format.
pub fn render_records(records: &StatusMap) -> String {
    let mut out = String::new();
    for (target, record) in records {
        let _ = writeln!(
            out,
            "{target} {} {} {}",
            record.status, record.since, record.failure_count
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatusMap {
        let mut map = StatusMap::new();
        map.insert("https://a.example".to_string(), StatusRecord::up(1000));
        map.insert("https://b.example".to_string(), StatusRecord::down(2000, 3));
        map
    }

    #[test]
    fn parse_full_lines() {
        let records = parse_records("https://a UP 100 0\nhttps://b DOWN 200 4\n");
        assert_eq!(records["https://a"], StatusRecord::up(100));
        assert_eq!(records["https://b"], StatusRecord::down(200, 4));
    }

    #[test]
    fn missing_count_defaults_to_zero() {
        let records = parse_records("https://b DOWN 200\n");
        assert_eq!(records["https://b"], StatusRecord::down(200, 0));
    }

    #[test]
    fn unparseable_count_defaults_to_zero() {
        let records = parse_records("https://b DOWN 200 lots\n");
        assert_eq!(records["https://b"].failure_count, 0);
    }

    #[test]
    fn up_line_with_count_is_normalised() {
        let records = parse_records("https://a UP 100 7\n");
        assert_eq!(records["https://a"], StatusRecord::up(100));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let content = "\nhttps://a\nhttps://b SIDEWAYS 1 0\nhttps://c UP soon 0\nhttps://d UP 5 0\n";
        let records = parse_records(content);
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("https://d"));
    }

    #[test]
    fn render_format() {
        let rendered = render_records(&sample());
        assert_eq!(rendered, "https://a.example UP 1000 0\nhttps://b.example DOWN 2000 3\n");
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatusStore::new(dir.path().join("status"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_store_persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("status");

        FileStatusStore::new(&path).save(&sample()).unwrap();

        let store = FileStatusStore::new(&path);
        assert_eq!(store.load().unwrap(), sample());
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn file_store_save_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatusStore::new(dir.path().join("status"));
        store.save(&sample()).unwrap();

        let mut next = StatusMap::new();
        next.insert("https://c.example".to_string(), StatusRecord::down(5, 1));
        store.save(&next).unwrap();

        assert_eq!(store.load().unwrap(), next);
    }

    #[test]
    fn file_store_read_error_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatusStore::new(dir.path());
        assert!(matches!(store.load(), Err(StateError::Read(_))));
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStatusStore::new();
        assert!(store.load().unwrap().is_empty());
        store.save(&sample()).unwrap();
        assert_eq!(store.snapshot(), sample());
    }
}
