//! Kiln archive assembly: the ordered virtual file set produced by one run.
//!
//! An [`Archive`] is built incrementally during a run and becomes an
//! immutable, path-sorted entry list on [`Archive::finish`]. All file I/O
//! lives here, at the write boundary; nothing inside the encoders touches
//! the filesystem.

#![forbid(unsafe_code)]

use std::io::Write;
use std::path::Path;

use rustc_hash::FxHashSet;
use tracing::debug;

use kiln_core::{Error, Result};

/// One named artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub data: Vec<u8>,
}

/// Ordered set of named artifacts; paths are unique.
#[derive(Debug, Default)]
pub struct Archive {
    entries: Vec<Entry>,
    paths: FxHashSet<String>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    /// Appends one artifact. Path collisions are an internal naming failure
    /// and poison the run.
    pub fn push(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<()> {
        let path = path.into();
        if !self.paths.insert(path.clone()) {
            return Err(Error::Configuration(format!("archive path collision: {path}")));
        }
        debug!(path = %path, "archive entry added");
        self.entries.push(Entry { path, data: data.into() });
        Ok(())
    }

    /// Final deterministic sort; the archive is immutable afterwards.
    pub fn finish(mut self) -> Vec<Entry> {
        self.entries.sort_by(|a, b| a.path.cmp(&b.path));
        self.entries
    }
}

/// Writes every entry under `dir`, creating subdirectories as needed.
pub fn write_dir(entries: &[Entry], dir: &Path) -> Result<()> {
    for e in entries {
        let target = dir.join(&e.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|err| Error::Input {
                path: parent.display().to_string(),
                reason: err.to_string(),
            })?;
        }
        std::fs::write(&target, &e.data).map_err(|err| Error::Input {
            path: target.display().to_string(),
            reason: err.to_string(),
        })?;
    }
    debug!(count = entries.len(), dir = %dir.display(), "archive written");
    Ok(())
}

/// Streams entry contents, in archive order, to one writer.
pub fn write_stream<W: Write>(entries: &[Entry], w: &mut W) -> Result<()> {
    for e in entries {
        w.write_all(&e.data).map_err(|err| Error::Input {
            path: e.path.clone(),
            reason: err.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_sorts_by_path() {
        let mut a = Archive::new();
        a.push("3_web_deploy.yaml", "b").unwrap();
        a.push("0_argo_ns.yaml", "a").unwrap();
        a.push("2_web_svc.yaml", "c").unwrap();
        let entries = a.finish();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["0_argo_ns.yaml", "2_web_svc.yaml", "3_web_deploy.yaml"]);
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let mut a = Archive::new();
        a.push("x.yaml", "1").unwrap();
        let err = a.push("x.yaml", "2").unwrap_err();
        assert!(err.to_string().contains("path collision"), "{err}");
    }

    #[test]
    fn write_dir_creates_nested_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let mut a = Archive::new();
        a.push("prod/2_conf_cm.yaml", "data: {}\n").unwrap();
        a.push("rbac/1_argo_cr.yaml", "rules: []\n").unwrap();
        write_dir(&a.finish(), tmp.path()).unwrap();
        assert!(tmp.path().join("prod/2_conf_cm.yaml").is_file());
        assert!(tmp.path().join("rbac/1_argo_cr.yaml").is_file());
    }

    #[test]
    fn write_stream_concatenates_in_order() {
        let mut a = Archive::new();
        a.push("b", "second").unwrap();
        a.push("a", "first-").unwrap();
        let mut out = Vec::new();
        write_stream(&a.finish(), &mut out).unwrap();
        assert_eq!(out, b"first-second");
    }
}
