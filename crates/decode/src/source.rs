//! Input sources: a fixed file list, a directory scan, or a reader.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use kiln_core::{Error, Result};

/// One raw input: where it came from plus its text.
#[derive(Debug, Clone)]
pub struct RawInput {
    pub origin: String,
    pub text: String,
}

/// Where documents come from.
pub enum Source {
    Files(Vec<PathBuf>),
    /// Non-recursive; only `.yaml`/`.yml` entries are read.
    Directory(PathBuf),
    Reader(Box<dyn Read + Send>),
}

impl Source {
    pub fn load(self) -> Result<Vec<RawInput>> {
        self.load_each().into_iter().collect()
    }

    /// Per-input results, so ignore-mode can skip one unreadable input and
    /// keep the rest.
    pub fn load_each(self) -> Vec<Result<RawInput>> {
        match self {
            Source::Files(paths) => paths.iter().map(|p| read_file(p)).collect(),
            Source::Directory(dir) => match read_directory(&dir) {
                Ok(inputs) => inputs.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            },
            Source::Reader(mut r) => {
                let mut text = String::new();
                match r.read_to_string(&mut text) {
                    Ok(_) => vec![Ok(RawInput { origin: "<reader>".into(), text })],
                    Err(e) => vec![Err(Error::Input { path: "<reader>".into(), reason: e.to_string() })],
                }
            }
        }
    }
}

fn read_file(path: &Path) -> Result<RawInput> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::Input {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(RawInput { origin: path.display().to_string(), text })
}

fn has_manifest_ext(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn read_directory(dir: &Path) -> Result<Vec<RawInput>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::Input {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_manifest_ext(p))
        .collect();
    // Stable intake order regardless of readdir order.
    paths.sort();
    debug!(dir = %dir.display(), files = paths.len(), "directory scan");
    paths.iter().map(|p| read_file(p)).collect()
}
