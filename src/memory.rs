// Bounded lesson log persisted to a single JSON file.
//
// The whole sequence is rewritten on every append. Append, truncation and
// persistence happen under one lock so concurrent requests cannot lose
// entries. The in-memory sequence stays authoritative when the file cannot
// be written.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::metrics;

/// Shown in prompts when there is nothing to recall.
pub const NO_LESSONS: &str = "No past lessons yet.";

/// One remembered lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// ISO-8601 creation time.
    pub timestamp: String,
    #[serde(rename = "memory")]
    pub text: String,
}

impl MemoryEntry {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            text: text.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("memory store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("memory store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct MemoryLog {
    store: Option<PathBuf>,
    entries: Mutex<Vec<MemoryEntry>>,
}

impl MemoryLog {
    /// Maximum number of retained entries.
    pub const CAPACITY: usize = 50;

    /// A log with no backing file.
    pub fn in_memory() -> Self {
        Self {
            store: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// A log backed by `path`, populated from it when possible.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let log = Self {
            store: Some(path.into()),
            entries: Mutex::new(Vec::new()),
        };
        log.load();
        log
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MemoryEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the in-memory sequence with the store's contents. A missing or
    /// unreadable store leaves the log empty.
    pub fn load(&self) {
        let loaded = match &self.store {
            None => Vec::new(),
            Some(path) if !path.exists() => {
                tracing::debug!(path = %path.display(), "No memory store yet");
                Vec::new()
            }
            Some(path) => match read_store(path) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Could not load memory: {e}");
                    Vec::new()
                }
            },
        };

        let mut entries = self.lock();
        *entries = loaded;
        truncate_to_capacity(&mut entries);
        metrics::MEMORY_ENTRIES.set(entries.len() as i64);
        tracing::info!(entries = entries.len(), "Memory loaded");
    }

    /// Record a lesson, evict the oldest beyond capacity, and persist.
    pub fn append(&self, text: impl Into<String>) -> MemoryEntry {
        let entry = MemoryEntry::now(text);
        let mut entries = self.lock();
        entries.push(entry.clone());
        truncate_to_capacity(&mut entries);
        metrics::MEMORY_ENTRIES.set(entries.len() as i64);

        if let Some(path) = &self.store {
            if let Err(e) = write_store(path, &entries) {
                metrics::MEMORY_PERSIST_FAILURES_TOTAL.inc();
                tracing::error!(path = %path.display(), "Could not save memory: {e}");
            }
        }
        entry
    }

    /// Every entry, oldest first.
    pub fn all(&self) -> Vec<MemoryEntry> {
        self.lock().clone()
    }

    /// The last `n` entries, oldest of the window first.
    pub fn recent(&self, n: usize) -> Vec<MemoryEntry> {
        let entries = self.lock();
        let start = entries.len().saturating_sub(n);
        entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn truncate_to_capacity(entries: &mut Vec<MemoryEntry>) {
    if entries.len() > MemoryLog::CAPACITY {
        let excess = entries.len() - MemoryLog::CAPACITY;
        entries.drain(..excess);
    }
}

fn read_store(path: &Path) -> Result<Vec<MemoryEntry>, MemoryError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_store(path: &Path, entries: &[MemoryEntry]) -> Result<(), MemoryError> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Bullet list for a prompt, or [`NO_LESSONS`] when empty.
pub fn render_lessons<S: AsRef<str>>(lessons: &[S]) -> String {
    if lessons.is_empty() {
        return NO_LESSONS.to_string();
    }
    lessons
        .iter()
        .map(|l| format!("- {}", l.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(entries: &[MemoryEntry]) -> Vec<String> {
        entries.iter().map(|e| e.text.clone()).collect()
    }

    #[test]
    fn test_append_bounded_fifo() {
        let log = MemoryLog::in_memory();
        for i in 0..60 {
            log.append(format!("lesson {i}"));
        }
        let all = log.all();
        assert_eq!(all.len(), 50);
        let expected: Vec<String> = (10..60).map(|i| format!("lesson {i}")).collect();
        assert_eq!(texts(&all), expected);
    }

    #[test]
    fn test_recent_window() {
        let log = MemoryLog::in_memory();
        assert!(log.recent(5).is_empty());
        for i in 0..8 {
            log.append(format!("l{i}"));
        }
        assert_eq!(texts(&log.recent(5)), vec!["l3", "l4", "l5", "l6", "l7"]);
        assert_eq!(log.recent(20).len(), 8);
        assert!(log.recent(0).is_empty());
    }

    #[test]
    fn test_render_lessons() {
        let empty: [&str; 0] = [];
        assert_eq!(render_lessons(&empty), "No past lessons yet.");
        assert_eq!(
            render_lessons(&["Dodge the dive", "Strike after the roar"]),
            "- Dodge the dive\n- Strike after the roar"
        );
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let log = MemoryLog::open(&path);
        assert!(log.is_empty());
        for i in 0..55 {
            log.append(format!("entry {i}"));
        }

        let reloaded = MemoryLog::open(&path);
        assert_eq!(reloaded.all(), log.all());
        assert_eq!(reloaded.len(), 50);
    }

    #[test]
    fn test_store_uses_memory_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let log = MemoryLog::open(&path);
        log.append("Watch the tail sweep");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["memory"], "Watch the tail sweep");
        assert!(raw[0]["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_corrupt_store_yields_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{ not json").unwrap();

        let log = MemoryLog::open(&path);
        assert!(log.is_empty());

        // Still usable, and the next append repairs the file.
        log.append("fresh start");
        assert_eq!(MemoryLog::open(&path).len(), 1);
    }

    #[test]
    fn test_unwritable_store_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory path cannot be written as a file.
        let log = MemoryLog::open(dir.path());
        log.append("kept in memory");
        assert_eq!(texts(&log.all()), vec!["kept in memory"]);
    }

    #[test]
    fn test_oversized_store_is_truncated_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let entries: Vec<MemoryEntry> = (0..70).map(|i| MemoryEntry::now(format!("e{i}"))).collect();
        std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let log = MemoryLog::open(&path);
        assert_eq!(log.len(), 50);
        assert_eq!(log.all()[0].text, "e20");
    }
}
