//! Component A: synchronous-looking file access over the URI namespace.
//! Side effects are confined here; every other component only ever talks
//! to a `FileAccess` trait object, the way `forge-lsp` keeps all of its
//! `foundry_compilers` I/O behind a `Config`/`ProjectPathsConfig` boundary.

use crate::error::AccessError;
use crate::uri::Uri;

pub trait FileAccess: Send + Sync {
    fn read(&self, uri: &Uri) -> Result<String, AccessError>;
    fn write(&self, uri: &Uri, code: &str) -> Result<Uri, AccessError>;
    fn exists(&self, uri: &Uri) -> Result<bool, AccessError>;
    /// Non-recursive on the top level, but walks subdirectories — source
    /// sync only needs the full tree under `contractPath`.
    fn list(&self, dir: &Uri) -> Result<Vec<Uri>, AccessError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileAccess;

impl FileAccess for RealFileAccess {
    fn read(&self, uri: &Uri) -> Result<String, AccessError> {
        let path = uri.to_path().ok_or_else(|| AccessError::InvalidPath(uri.to_string()))?;
        std::fs::read_to_string(&path).map_err(|source| AccessError::Io { uri: uri.clone(), source })
    }

    fn write(&self, uri: &Uri, code: &str) -> Result<Uri, AccessError> {
        let path = uri.to_path().ok_or_else(|| AccessError::InvalidPath(uri.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AccessError::Io { uri: uri.clone(), source })?;
        }
        std::fs::write(&path, code).map_err(|source| AccessError::Io { uri: uri.clone(), source })?;
        Ok(uri.clone())
    }

    fn exists(&self, uri: &Uri) -> Result<bool, AccessError> {
        let Some(path) = uri.to_path() else { return Ok(false) };
        Ok(path.exists())
    }

    fn list(&self, dir: &Uri) -> Result<Vec<Uri>, AccessError> {
        let path = dir.to_path().ok_or_else(|| AccessError::InvalidPath(dir.to_string()))?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(&path).into_iter() {
            let entry = entry.map_err(|e| AccessError::Io {
                uri: dir.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })?;
            if entry.file_type().is_file() {
                if let Some(uri) = Uri::from_file_path(entry.path()) {
                    out.push(uri);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// An in-memory `FileAccess` used by component-level unit tests that
    /// don't want to touch disk (build validator, source state machine,
    /// import resolver).
    #[derive(Default)]
    pub struct FakeFileAccess {
        files: Mutex<BTreeMap<String, String>>,
    }

    impl FakeFileAccess {
        pub fn new(files: impl IntoIterator<Item = (Uri, String)>) -> Self {
            let files = files.into_iter().map(|(u, c)| (u.as_str().to_string(), c)).collect();
            Self { files: Mutex::new(files) }
        }
    }

    impl FileAccess for FakeFileAccess {
        fn read(&self, uri: &Uri) -> Result<String, AccessError> {
            self.files
                .lock()
                .unwrap()
                .get(uri.as_str())
                .cloned()
                .ok_or_else(|| AccessError::NotFound(uri.clone()))
        }

        fn write(&self, uri: &Uri, code: &str) -> Result<Uri, AccessError> {
            self.files.lock().unwrap().insert(uri.as_str().to_string(), code.to_string());
            Ok(uri.clone())
        }

        fn exists(&self, uri: &Uri) -> Result<bool, AccessError> {
            Ok(self.files.lock().unwrap().contains_key(uri.as_str()))
        }

        fn list(&self, dir: &Uri) -> Result<Vec<Uri>, AccessError> {
            let files = self.files.lock().unwrap();
            Ok(files
                .keys()
                .filter_map(|k| {
                    let url = tower_lsp::lsp_types::Url::parse(k).ok()?;
                    let candidate = Uri::from_url(url);
                    dir.contains(&candidate).then_some(candidate)
                })
                .collect())
        }
    }
}
