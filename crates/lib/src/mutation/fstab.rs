//! Mount table rewrite.

use camino::Utf8Path;

use super::MutationError;
use crate::fsops::FsOps;
use crate::parsers::fstab::{render_fstab, FstabEntry};

const FSTAB_PATH: &str = "etc/fstab";

pub(super) fn apply(
    fs: &dyn FsOps,
    target: &Utf8Path,
    entries: &[FstabEntry],
) -> Result<(), MutationError> {
    let path = target.join(FSTAB_PATH);
    // A root image without an fstab was never a working system; refuse
    // to conjure one up.
    if !fs.exists(&path) {
        return Err(MutationError::MissingTargetFile { path });
    }
    fs.write(&path, &render_fstab(entries))
        .map_err(|source| MutationError::WriteFailed { path, source })?;
    tracing::info!("Rewrote {FSTAB_PATH} with {} entries", entries.len());
    Ok(())
}
