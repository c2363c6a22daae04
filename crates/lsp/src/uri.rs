//! The `URI` data-model item from spec.md §3: a stable opaque identifier
//! for a file or directory, with parent/filename/extension/containment
//! operations. Backed by `tower_lsp::lsp_types::Url` — the type the rest
//! of the `tower-lsp` surface (and `forge-lsp`'s own test harness) already
//! speaks.

use std::path::{Path, PathBuf};
use tower_lsp::lsp_types::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri(Url);

impl Uri {
    pub fn from_url(url: Url) -> Self {
        Self(url)
    }

    pub fn from_file_path(path: impl AsRef<Path>) -> Option<Self> {
        let canonical = dunce::canonicalize(path.as_ref()).ok()?;
        Url::from_file_path(canonical).ok().map(Self)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn to_path(&self) -> Option<PathBuf> {
        self.0.to_file_path().ok()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn filename(&self) -> Option<String> {
        self.to_path().and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    }

    pub fn extension(&self) -> Option<String> {
        self.to_path().and_then(|p| p.extension().map(|e| e.to_string_lossy().into_owned()))
    }

    pub fn parent(&self) -> Option<Uri> {
        let path = self.to_path()?;
        let parent = path.parent()?;
        Url::from_file_path(parent).ok().map(Self).map(|u| u.ensure_dir())
    }

    /// Normalizes this URI's path to end in `/`. `Url::join` follows WHATWG
    /// semantics and drops the base's last path segment unless the base is
    /// already in "directory" form, so every directory-typed `Uri` in this
    /// crate (workspace root, dependency root, a file's parent) needs this
    /// before it's used as a join/containment base.
    pub fn ensure_dir(&self) -> Uri {
        if self.0.path().ends_with('/') {
            return self.clone();
        }
        let mut url = self.0.clone();
        let path = format!("{}/", url.path());
        url.set_path(&path);
        Self(url)
    }

    pub fn join(&self, relative: &str) -> Option<Uri> {
        self.ensure_dir().0.join(relative).ok().map(Self)
    }

    /// `true` iff `other` is `self` or a descendant of `self` in the path
    /// hierarchy, per spec.md's containment rule: "`b`'s path starts with
    /// `a`'s path after normalization".
    pub fn contains(&self, other: &Uri) -> bool {
        match self.ensure_dir().0.make_relative(&other.0) {
            Some(relative) => !relative.starts_with(".."),
            None => false,
        }
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn contains_checks_path_hierarchy() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("contracts")).unwrap();
        fs::write(dir.path().join("contracts/A.ral"), "").unwrap();

        let workspace = Uri::from_file_path(dir.path()).unwrap();
        let nested = Uri::from_file_path(dir.path().join("contracts/A.ral")).unwrap();

        assert!(workspace.contains(&nested));
        assert!(workspace.contains(&workspace));
        assert!(!nested.contains(&workspace));
    }
}
