//! The in-memory "GPFS" store (§3, §4.A): a directory→file→lines map
//! shared between job threads and the HTTP control surface. Created at
//! process start, lives for the process's lifetime, never persisted.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::process::ChildStdout;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::{EngineError, Result};

#[derive(Default)]
struct Store {
    files_in: HashMap<String, Vec<String>>,
    lines_of: HashMap<(String, String), Vec<String>>,
}

/// Shared, coarse-locked in-memory file system. A single mutex covers
/// every operation below; at this scale that is both sufficient and
/// cheap (§5, §9 "shared store safety").
pub struct Gpfs {
    inner: Mutex<Store>,
}

impl Gpfs {
    pub fn new() -> Gpfs {
        Gpfs {
            inner: Mutex::new(Store::default()),
        }
    }

    pub fn list_dirs(&self) -> Vec<String> {
        self.inner.lock().unwrap().files_in.keys().cloned().collect()
    }

    pub fn list_files(&self, dir: &str) -> Vec<String> {
        let dir = strip_prefix(dir);
        self.inner
            .lock()
            .unwrap()
            .files_in
            .get(&dir)
            .cloned()
            .unwrap_or_default()
    }

    /// Creates `file` under `dir` on first append; `line` must not carry a
    /// trailing newline (§3).
    pub fn append(&self, dir: &str, file: &str, line: String) {
        let dir = strip_prefix(dir);
        let mut store = self.inner.lock().unwrap();
        let files = store.files_in.entry(dir.clone()).or_default();
        if !files.iter().any(|f| f == file) {
            files.push(file.to_string());
            store.lines_of.insert((dir.clone(), file.to_string()), Vec::new());
        }
        store
            .lines_of
            .get_mut(&(dir, file.to_string()))
            .unwrap()
            .push(line);
    }

    pub fn cat(&self, dir: &str, file: &str) -> Result<Vec<String>> {
        let dir = strip_prefix(dir);
        self.inner
            .lock()
            .unwrap()
            .lines_of
            .get(&(dir.clone(), file.to_string()))
            .cloned()
            .ok_or(EngineError::NotFound {
                dir,
                file: file.to_string(),
            })
    }

    pub fn head(&self, dir: &str, file: &str, n: usize) -> Result<Vec<String>> {
        let lines = self.cat(dir, file)?;
        Ok(lines.into_iter().take(n).collect())
    }

    pub fn tail(&self, dir: &str, file: &str, n: usize) -> Result<Vec<String>> {
        let lines = self.cat(dir, file)?;
        let skip = lines.len().saturating_sub(n);
        Ok(lines.into_iter().skip(skip).collect())
    }

    /// Removes the directory, its file list, and all (dir,file) line
    /// sequences, atomically with respect to other GPFS operations.
    pub fn rm_dir(&self, dir: &str) {
        let dir = strip_prefix(dir);
        let mut store = self.inner.lock().unwrap();
        if let Some(files) = store.files_in.remove(&dir) {
            for f in files {
                store.lines_of.remove(&(dir.clone(), f));
            }
        }
    }
}

impl Default for Gpfs {
    fn default() -> Gpfs {
        Gpfs::new()
    }
}

/// Whether an external-facing path denotes a GPFS directory.
pub fn is_gpfs(path: &str) -> bool {
    path.starts_with("gpfs:")
}

fn strip_prefix(dir: &str) -> String {
    dir.strip_prefix("gpfs:").unwrap_or(dir).to_string()
}

/// Spawns a thread that reads lines from `stdout`, strips the trailing
/// newline, and appends each to `fs_store[dir, file]`. Used wherever a
/// mapper's or reducer's output lands in the GPFS store (§4.C, §4.F).
pub fn consume_into(
    fs_store: Arc<Gpfs>,
    dir: String,
    file: String,
    stdout: ChildStdout,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(l) => fs_store.append(&dir, &file, l),
                Err(e) => {
                    tracing::warn!(dir = %dir, file = %file, error = %e, "error reading subprocess stdout");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_append_and_cat() {
        let fs = Gpfs::new();
        fs.append("d", "f", "L1".to_string());
        fs.append("d", "f", "L2".to_string());
        assert_eq!(fs.cat("d", "f").unwrap(), vec!["L1", "L2"]);
        assert_eq!(fs.list_files("d"), vec!["f".to_string()]);
    }

    #[test]
    fn namespace_idempotence() {
        let fs = Gpfs::new();
        fs.append("gpfs:d", "f", "x".to_string());
        assert_eq!(fs.cat("d", "f").unwrap(), vec!["x"]);
        assert_eq!(fs.cat("gpfs:d", "f").unwrap(), vec!["x"]);
        assert_eq!(fs.list_dirs(), vec!["d".to_string()]);
    }

    #[test]
    fn rmdir_removes_files_and_lines() {
        let fs = Gpfs::new();
        fs.append("d", "f", "x".to_string());
        fs.rm_dir("d");
        assert!(fs.list_files("d").is_empty());
        assert!(fs.cat("d", "f").is_err());
    }

    #[test]
    fn head_and_tail() {
        let fs = Gpfs::new();
        for line in ["L1", "L2", "L3", "L4", "L5"] {
            fs.append("d", "f", line.to_string());
        }
        assert_eq!(fs.head("d", "f", 2).unwrap(), vec!["L1", "L2"]);
        assert_eq!(fs.tail("d", "f", 2).unwrap(), vec!["L4", "L5"]);
    }

    #[test]
    fn cat_unknown_file_is_not_found() {
        let fs = Gpfs::new();
        match fs.cat("nope", "x") {
            Err(EngineError::NotFound { .. }) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
