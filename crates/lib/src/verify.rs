//! Target sanity verification, beyond the mount-identity guard.
//!
//! A migrated image that passes the guard can still be unusable: not a
//! Linux root at all, or missing modules for the kernel the instance
//! will boot with. `check` runs these before any transfer proceeds.

use anyhow::{ensure, Result};
use camino::Utf8Path;
use fn_error_context::context;

use crate::fsops::FsOps;

/// Verify the target looks like a Linux root, and optionally that it
/// carries kernel modules for `kernel_release`.
#[context("Verifying target root")]
pub fn verify_target(
    fs: &dyn FsOps,
    target: &Utf8Path,
    kernel_release: Option<&str>,
) -> Result<()> {
    ensure!(
        fs.is_dir(&target.join("etc")),
        "Target does not look like a Linux root (no etc/ directory)"
    );
    if let Some(release) = kernel_release {
        let modules = target.join("lib/modules").join(release);
        ensure!(
            fs.is_dir(&modules),
            "Target has no modules for kernel {release} (expected lib/modules/{release})"
        );
        tracing::debug!("Target has modules for kernel {release}");
    }
    Ok(())
}
