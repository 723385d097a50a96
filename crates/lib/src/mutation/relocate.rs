//! Relocation of a mounted volume onto a RAM-backed copy.
//!
//! This is the highest-risk mutation: after the bulk copy the source is
//! unmounted and the tmpfs is move-mounted onto the original path in a
//! single atomic operation, so the mount point is never absent. There
//! is no retry; a failure part-way leaves the target indeterminate and
//! the boot is expected to abort.

use camino::{Utf8Path, Utf8PathBuf};

use super::MutationError;
use crate::config::FirstbootConfig;
use crate::fsops::FsOps;

/// Where the replacement volume is staged before the swap.
const STAGING: &str = "/run/p2v-firstboot/tmproot";
/// Mode for the tmpfs root, matching the volume it replaces.
const TMPFS_MODE: u32 = 0o755;

pub(super) fn apply(
    fs: &dyn FsOps,
    config: &FirstbootConfig,
    mount_point: &Utf8Path,
    size_limit: Option<u64>,
) -> Result<(), MutationError> {
    let size = size_limit.or(config.size_limit_bytes);
    let staging = Utf8Path::new(STAGING);
    let swap_failed = |mountpoint: &Utf8Path| {
        let mountpoint = mountpoint.to_owned();
        move |source: std::io::Error| MutationError::MountSwapFailed { mountpoint, source }
    };

    fs.create_dir_all(staging).map_err(swap_failed(staging))?;
    fs.mount_tmpfs(staging, size, TMPFS_MODE)
        .map_err(swap_failed(staging))?;
    tracing::info!("Copying {mount_point} into RAM (cap: {size:?} bytes)");
    fs.copy_tree(mount_point, staging)
        .map_err(|source| MutationError::CopyFailed {
            from: mount_point.to_owned(),
            to: Utf8PathBuf::from(STAGING),
            source,
        })?;
    fs.unmount(mount_point).map_err(swap_failed(mount_point))?;
    fs.move_mount(staging, mount_point)
        .map_err(swap_failed(mount_point))?;
    tracing::info!("Relocated {mount_point} onto tmpfs");
    Ok(())
}
