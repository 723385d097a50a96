//! Target validation.
//!
//! Every pipeline run starts here: no mutation may ever be applied to
//! the live root filesystem, even through a bind-mounted alias.

use camino::Utf8Path;
use p2v_utils::PathQuotedDisplay;

use crate::fsops::FsOps;

/// Rejection of a proposed target path. These are all fatal; there is
/// no recovery path besides fixing the invocation.
#[derive(thiserror::Error, Debug)]
pub enum GuardError {
    /// The path was unset, absent, or not a directory.
    #[error("target path is unset, missing, or not a directory: {}", PathQuotedDisplay::new(path))]
    EmptyOrMissing {
        /// The rejected path (possibly empty).
        path: String,
    },
    /// The path resolves to the same mounted filesystem as `/`.
    #[error("target {} is the live root filesystem", PathQuotedDisplay::new(path))]
    IsRootFilesystem {
        /// The rejected path.
        path: String,
    },
}

/// Validate that `target` is a real, non-root mount. Read-only and
/// re-entrant; safe to call any number of times.
pub fn validate(fs: &dyn FsOps, target: &Utf8Path) -> Result<(), GuardError> {
    let reject_missing = || GuardError::EmptyOrMissing {
        path: target.as_str().to_owned(),
    };
    if target.as_str().is_empty() || !fs.is_dir(target) {
        return Err(reject_missing());
    }
    // Mount identity, not string comparison: a bind mount of / under
    // another name must also be rejected.
    let target_dev = fs.device_of(target).map_err(|_| reject_missing())?;
    let root_dev = fs
        .device_of(Utf8Path::new("/"))
        .map_err(|_| reject_missing())?;
    if target_dev == root_dev {
        tracing::error!("Refusing to operate on the running root (device {root_dev})");
        return Err(GuardError::IsRootFilesystem {
            path: target.as_str().to_owned(),
        });
    }
    tracing::debug!("Validated target {target} (device {target_dev})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsops::memfs::MemFs;

    #[test]
    fn test_rejects_empty_and_missing() {
        let fs = MemFs::new();
        for path in ["", "/nosuchdir"] {
            let err = validate(&fs, Utf8Path::new(path)).unwrap_err();
            assert!(matches!(err, GuardError::EmptyOrMissing { .. }), "{path}");
        }
    }

    #[test]
    fn test_rejects_root_itself() {
        let fs = MemFs::new();
        let err = validate(&fs, Utf8Path::new("/")).unwrap_err();
        assert!(matches!(err, GuardError::IsRootFilesystem { .. }));
    }

    #[test]
    fn test_rejects_path_on_root_device() {
        let fs = MemFs::new();
        // A plain directory on the root filesystem, not its own mount
        fs.add_dir("/target");
        let err = validate(&fs, Utf8Path::new("/target")).unwrap_err();
        assert!(matches!(err, GuardError::IsRootFilesystem { .. }));
    }

    #[test]
    fn test_rejects_bind_alias_of_root() {
        let fs = MemFs::new();
        fs.add_bind_alias("/mnt/rootalias", Utf8Path::new("/"));
        let err = validate(&fs, Utf8Path::new("/mnt/rootalias")).unwrap_err();
        assert!(matches!(err, GuardError::IsRootFilesystem { .. }));
    }

    #[test]
    fn test_accepts_separate_mount_and_is_reentrant() {
        let fs = MemFs::new();
        fs.add_mount("/target");
        validate(&fs, Utf8Path::new("/target")).unwrap();
        validate(&fs, Utf8Path::new("/target")).unwrap();
    }
}
