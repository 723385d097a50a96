//! Password disablement inside the target root.

use camino::Utf8Path;

use super::MutationError;
use crate::fsops::FsOps;
use crate::parsers::shadow;

const SHADOW_PATH: &str = "etc/shadow";

pub(super) fn apply(
    fs: &dyn FsOps,
    target: &Utf8Path,
    account: &str,
) -> Result<(), MutationError> {
    let path = target.join(SHADOW_PATH);
    let content = fs
        .read_to_string(&path)
        .map_err(|_| MutationError::MissingTargetFile { path: path.clone() })?;
    // A missing or unparseable entry both mean the image's account
    // database is not what a P2V source should contain.
    let locked = match shadow::lock_account(&content, account) {
        Ok(Some(new)) => new,
        Ok(None) => {
            tracing::error!("Account {account} has no entry in {path}");
            return Err(MutationError::MissingTargetFile { path });
        }
        Err(err) => {
            tracing::error!("Unusable shadow database in {path}: {err:#}");
            return Err(MutationError::MissingTargetFile { path });
        }
    };
    if locked == content {
        tracing::debug!("Password for {account} already disabled");
        return Ok(());
    }
    fs.write(&path, &locked)
        .map_err(|source| MutationError::WriteFailed { path, source })?;
    tracing::info!("Disabled password for {account}");
    Ok(())
}
