//! Resolution of manifest-declared paths under a content root
//!
//! Declared paths come from untrusted metadata. Every component must be a
//! plain name: absolute paths and `..` are rejected before the filesystem is
//! touched.

use crate::verify::{VerifyError, VerifyResult};
use std::path::{Component, Path, PathBuf};

/// Join the declared `components` under `root`
pub fn resolve_declared_path<S: AsRef<str>>(root: &Path, components: &[S]) -> VerifyResult<PathBuf> {
    let display = || {
        components
            .iter()
            .map(|c| c.as_ref())
            .collect::<Vec<_>>()
            .join("/")
    };

    let mut rel = PathBuf::new();
    for component in components {
        for part in Path::new(component.as_ref()).components() {
            match part {
                Component::Normal(name) => rel.push(name),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(VerifyError::UnsafePath {
                        path: display(),
                        reason: "parent traversal not allowed",
                    })
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(VerifyError::UnsafePath {
                        path: display(),
                        reason: "absolute paths are not allowed",
                    })
                }
            }
        }
    }

    if rel.as_os_str().is_empty() {
        return Err(VerifyError::UnsafePath {
            path: display(),
            reason: "empty path",
        });
    }
    Ok(root.join(rel))
}
