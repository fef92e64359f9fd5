//! Containment checks for serving files out of allow-listed directories.
//!
//! A requested path is joined onto its root, resolved through symlinks and
//! accepted only if the result is still inside the root's resolved path.

use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum PathSafetyError {
    #[error("directory '{0}' is not allowed")]
    NotAllowed(String),

    #[error("path '{0}' escapes its root directory")]
    Escapes(String),

    #[error("path '{0}' does not exist")]
    NotFound(String),

    #[error("I/O error resolving '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Resolve `relative` under `root`, rejecting anything that lands outside it.
pub fn resolve_within(root: &Path, relative: &Path) -> Result<PathBuf, PathSafetyError> {
    let shown = relative.display().to_string();

    let root = root.canonicalize().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => PathSafetyError::NotFound(root.display().to_string()),
        _ => PathSafetyError::Io {
            path: root.display().to_string(),
            source,
        },
    })?;

    if relative
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(PathSafetyError::Escapes(shown));
    }

    let candidate = root.join(relative);
    match candidate.canonicalize() {
        Ok(resolved) if resolved.starts_with(&root) => Ok(resolved),
        Ok(_) => Err(PathSafetyError::Escapes(shown)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if escapes_lexically(relative) {
                Err(PathSafetyError::Escapes(shown))
            } else {
                Err(PathSafetyError::NotFound(shown))
            }
        }
        Err(source) => Err(PathSafetyError::Io { path: shown, source }),
    }
}

fn escapes_lexically(relative: &Path) -> bool {
    let mut depth: usize = 0;
    for component in relative.components() {
        match component {
            Component::ParentDir => {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}

/// The set of directory names that may be listed and served, under a common base.
#[derive(Debug, Clone)]
pub struct StaticRoots {
    base: PathBuf,
    allowed: Vec<String>,
}

impl StaticRoots {
    pub fn new(base: impl Into<PathBuf>, allowed: Vec<String>) -> Self {
        Self {
            base: base.into(),
            allowed,
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Filesystem path of an allow-listed directory.
    pub fn root(&self, dir: &str) -> Result<PathBuf, PathSafetyError> {
        if !self.allowed.iter().any(|a| a == dir) {
            return Err(PathSafetyError::NotAllowed(dir.to_string()));
        }
        Ok(self.base.join(dir))
    }

    /// Resolve `subpath` inside the allow-listed directory `dir`.
    pub fn resolve(&self, dir: &str, subpath: &str) -> Result<PathBuf, PathSafetyError> {
        let root = self.root(dir)?;
        resolve_within(&root, Path::new(subpath))
    }
}
