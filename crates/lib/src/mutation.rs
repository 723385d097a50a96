//! The mutation catalogue.
//!
//! Each variant is one idempotent filesystem edit against a validated
//! target root. Construction is data-only (and deserializable from a
//! pipeline file); all I/O happens in [`Mutation::apply`] through the
//! capability layer.

mod credential;
mod fstab;
mod inittab;
mod relocate;

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use p2v_utils::PathQuotedDisplay;
use serde::Deserialize;

use crate::config::FirstbootConfig;
use crate::fsops::FsOps;
use crate::parsers::fstab::FstabEntry;
use crate::parsers::inittab::InittabEntry;

/// Failure of a single mutation. All fatal; the pipeline never retries.
#[derive(thiserror::Error, Debug)]
pub enum MutationError {
    /// A file the mutation requires to pre-exist is absent, which
    /// signals a malformed target image.
    #[error("required file missing in target image: {}", PathQuotedDisplay::new(path))]
    MissingTargetFile {
        /// The absent file.
        path: Utf8PathBuf,
    },
    /// A file write failed.
    #[error("writing {}", PathQuotedDisplay::new(path))]
    WriteFailed {
        /// The file being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The bulk copy into the replacement volume failed.
    #[error("copying {} into {}", PathQuotedDisplay::new(from), PathQuotedDisplay::new(to))]
    CopyFailed {
        /// Copy source.
        from: Utf8PathBuf,
        /// Copy destination.
        to: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Creating, detaching, or moving a mount failed. The target may be
    /// left in an indeterminate state; this is not recoverable.
    #[error("mount swap at {}", PathQuotedDisplay::new(mountpoint))]
    MountSwapFailed {
        /// The mountpoint involved.
        mountpoint: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// One filesystem edit, fully specified by its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Mutation {
    /// Disable an account's password inside the target root, keeping
    /// the account itself. Re-running on a locked account is a no-op.
    DisablePassword {
        /// The account to lock.
        account: String,
    },
    /// Overwrite the target's `etc/fstab` with a fully specified entry
    /// set. The file must already exist.
    RewriteFstab {
        /// The complete new mount table.
        entries: Vec<FstabEntry>,
    },
    /// Append one entry to the target's `etc/inittab`, but only when
    /// the configured hypervisor mode matches, and only if the line is
    /// not already present.
    AppendInittab {
        /// The entry to add.
        entry: InittabEntry,
        /// Only apply when this hypervisor mode is active; `None`
        /// applies unconditionally.
        #[serde(default)]
        only_if_hypervisor: Option<String>,
    },
    /// Copy a mounted volume into a fresh size-capped tmpfs and swap
    /// the mount so the original path is served from RAM. Failure
    /// mid-way leaves the target indeterminate.
    RelocateTree {
        /// The mount to relocate (typically the target root itself).
        mount_point: Utf8PathBuf,
        /// Size cap in bytes; falls back to the configured default.
        #[serde(default)]
        size_limit: Option<u64>,
    },
}

impl Mutation {
    /// The stable kind tag, as used in pipeline files and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::DisablePassword { .. } => "disable-password",
            Mutation::RewriteFstab { .. } => "rewrite-fstab",
            Mutation::AppendInittab { .. } => "append-inittab",
            Mutation::RelocateTree { .. } => "relocate-tree",
        }
    }

    /// Apply this mutation to the configured target.
    pub fn apply(&self, fs: &dyn FsOps, config: &FirstbootConfig) -> Result<(), MutationError> {
        let target: &Utf8Path = &config.target;
        match self {
            Mutation::DisablePassword { account } => credential::apply(fs, target, account),
            Mutation::RewriteFstab { entries } => fstab::apply(fs, target, entries),
            Mutation::AppendInittab {
                entry,
                only_if_hypervisor,
            } => inittab::apply(fs, config, entry, only_if_hypervisor.as_deref()),
            Mutation::RelocateTree {
                mount_point,
                size_limit,
            } => relocate::apply(fs, config, mount_point, *size_limit),
        }
    }
}
