//! # Workspace Sandbox
//!
//! Every filesystem access made on behalf of the model goes through
//! [`Sandbox::resolve`]. It is the only constructor of [`SandboxedPath`], so a tool
//! cannot touch a path that was not checked against the workspace root.

use crate::error::SandboxError;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// The workspace root all tool paths are confined to.
#[derive(Debug, Clone)]
pub struct Sandbox {
    base_dir: PathBuf,
}

/// An absolute path that was inside the workspace when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxedPath {
    path: PathBuf,
    display: String,
}

impl SandboxedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// The path relative to the workspace root, `.` for the root itself.
    pub fn display_name(&self) -> &str {
        &self.display
    }
}

impl AsRef<Path> for SandboxedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for SandboxedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl Sandbox {
    /// Creates a sandbox rooted at `base_dir`, which must be an existing directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let base_dir = base_dir.as_ref();
        let canonical = base_dir
            .canonicalize()
            .map_err(|_| SandboxError::InvalidBase {
                path: base_dir.to_path_buf(),
            })?;
        if !canonical.is_dir() {
            return Err(SandboxError::InvalidBase { path: canonical });
        }
        Ok(Self {
            base_dir: canonical,
        })
    }

    /// The canonical workspace root.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves `raw` against the workspace and checks that it stays inside.
    ///
    /// Relative paths are joined onto the workspace root. The longest prefix that
    /// exists on disk is canonicalized, which resolves `..` and follows symlinks;
    /// the components that do not exist yet (a file about to be written) are
    /// appended lexically. A symlink pointing outside the workspace is therefore
    /// rejected even when the final component has not been created.
    pub fn resolve(&self, raw: &str) -> Result<SandboxedPath, SandboxError> {
        let joined = self.base_dir.join(raw);

        let mut existing = joined.as_path();
        let mut missing = Vec::new();
        // symlink_metadata so that a dangling link counts as present and fails
        // canonicalization below instead of being written through.
        while fs::symlink_metadata(existing).is_err() {
            match (existing.components().next_back(), existing.parent()) {
                (Some(last), Some(parent)) => {
                    missing.push(last);
                    existing = parent;
                }
                _ => break,
            }
        }

        let mut resolved =
            existing
                .canonicalize()
                .map_err(|source| SandboxError::Unresolvable {
                    path: raw.to_string(),
                    source,
                })?;

        for component in missing.into_iter().rev() {
            match component {
                Component::Normal(name) => resolved.push(name),
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }

        if !resolved.starts_with(&self.base_dir) {
            debug!(path = raw, resolved = %resolved.display(), "rejected path outside workspace");
            return Err(SandboxError::Violation {
                path: raw.to_string(),
                base: self.base_dir.clone(),
            });
        }

        let display = match resolved.strip_prefix(&self.base_dir) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => resolved.display().to_string(),
        };

        Ok(SandboxedPath {
            path: resolved,
            display,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::Builder;

    // Layout: <tmp>/workspace/{file.txt, sub/} and <tmp>/outside/secret.txt
    fn setup_test_dirs() -> (tempfile::TempDir, Sandbox) {
        let tmp_dir = Builder::new().prefix("sandbox-test-").tempdir().unwrap();
        let workspace = tmp_dir.path().join("workspace");
        let outside = tmp_dir.path().join("outside");

        fs::create_dir_all(workspace.join("sub")).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(workspace.join("file.txt"), "content").unwrap();
        fs::write(outside.join("secret.txt"), "secret").unwrap();

        let sandbox = Sandbox::new(&workspace).unwrap();
        (tmp_dir, sandbox)
    }

    #[test]
    fn test_relative_file_in_workspace() {
        let (_tmp_dir, sandbox) = setup_test_dirs();
        let resolved = sandbox.resolve("file.txt").unwrap();
        assert_eq!(resolved.as_path(), sandbox.base_dir().join("file.txt"));
        assert_eq!(resolved.display_name(), "file.txt");
    }

    #[test]
    fn test_workspace_root_itself() {
        let (_tmp_dir, sandbox) = setup_test_dirs();
        let resolved = sandbox.resolve(".").unwrap();
        assert_eq!(resolved.as_path(), sandbox.base_dir());
        assert_eq!(resolved.display_name(), ".");
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let (_tmp_dir, sandbox) = setup_test_dirs();
        let result = sandbox.resolve("../outside/secret.txt");
        assert!(matches!(result, Err(SandboxError::Violation { .. })));

        let result = sandbox.resolve("../etc/passwd");
        assert!(matches!(result, Err(SandboxError::Violation { .. })));
    }

    #[test]
    fn test_traversal_that_comes_back_is_allowed() {
        let (_tmp_dir, sandbox) = setup_test_dirs();
        let resolved = sandbox.resolve("sub/../file.txt").unwrap();
        assert_eq!(resolved.display_name(), "file.txt");
    }

    #[test]
    fn test_absolute_path_outside_is_rejected() {
        let (tmp_dir, sandbox) = setup_test_dirs();
        let secret = tmp_dir.path().join("outside/secret.txt");
        let result = sandbox.resolve(secret.to_str().unwrap());
        assert!(matches!(result, Err(SandboxError::Violation { .. })));
    }

    #[test]
    fn test_absolute_path_inside_is_allowed() {
        let (_tmp_dir, sandbox) = setup_test_dirs();
        let inside = sandbox.base_dir().join("sub");
        let resolved = sandbox.resolve(inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved.display_name(), "sub");
    }

    #[test]
    fn test_new_nested_file_is_allowed() {
        let (_tmp_dir, sandbox) = setup_test_dirs();
        let resolved = sandbox.resolve("deeply/nested/new.txt").unwrap();
        assert!(resolved.as_path().starts_with(sandbox.base_dir()));
        assert_eq!(resolved.display_name(), "deeply/nested/new.txt");
    }

    #[test]
    fn test_missing_components_cannot_climb_out() {
        let (_tmp_dir, sandbox) = setup_test_dirs();
        let result = sandbox.resolve("missing/../../outside/new.txt");
        assert!(matches!(result, Err(SandboxError::Violation { .. })));
    }

    #[test]
    fn test_base_must_exist() {
        let (tmp_dir, _sandbox) = setup_test_dirs();
        let result = Sandbox::new(tmp_dir.path().join("nope"));
        assert!(matches!(result, Err(SandboxError::InvalidBase { .. })));

        let result = Sandbox::new(tmp_dir.path().join("workspace/file.txt"));
        assert!(matches!(result, Err(SandboxError::InvalidBase { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_rejected() {
        let (tmp_dir, sandbox) = setup_test_dirs();
        let outside = tmp_dir.path().join("outside");
        std::os::unix::fs::symlink(&outside, sandbox.base_dir().join("link")).unwrap();

        let result = sandbox.resolve("link/secret.txt");
        assert!(matches!(result, Err(SandboxError::Violation { .. })));

        // Not-yet-existing file below the escaping link.
        let result = sandbox.resolve("link/new.txt");
        assert!(matches!(result, Err(SandboxError::Violation { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_workspace_is_allowed() {
        let (_tmp_dir, sandbox) = setup_test_dirs();
        std::os::unix::fs::symlink(
            sandbox.base_dir().join("file.txt"),
            sandbox.base_dir().join("alias.txt"),
        )
        .unwrap();

        let resolved = sandbox.resolve("alias.txt").unwrap();
        assert_eq!(resolved.display_name(), "file.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_rejected() {
        let (tmp_dir, sandbox) = setup_test_dirs();
        let target = tmp_dir.path().join("outside/not_yet.txt");
        std::os::unix::fs::symlink(&target, sandbox.base_dir().join("dangling")).unwrap();

        let result = sandbox.resolve("dangling");
        assert!(result.is_err());
        assert!(!target.exists());
    }
}
