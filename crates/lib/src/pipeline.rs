//! The guarded mutation pipeline.
//!
//! Runs the guard exactly once, then each mutation in order, stopping
//! at the first failure. Mutations already applied are deliberately not
//! rolled back: these run once during early boot, where any failure
//! aborts the boot rather than being compensated.

use crate::config::FirstbootConfig;
use crate::fsops::FsOps;
use crate::guard::{self, GuardError};
use crate::mutation::{Mutation, MutationError};
use crate::parsers::fstab::FstabEntry;
use crate::parsers::inittab::InittabEntry;

/// Failure of a pipeline run, identifying where it stopped.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The target was rejected before any mutation ran.
    #[error(transparent)]
    Guard(#[from] GuardError),
    /// A mutation failed; everything before it was applied and stays
    /// applied, everything after it never ran.
    #[error("mutation {index} ({kind}) failed")]
    Mutation {
        /// Zero-based position in the mutation sequence.
        index: usize,
        /// The failed mutation's kind tag.
        kind: &'static str,
        /// The underlying failure.
        #[source]
        source: MutationError,
    },
}

/// An ordered mutation sequence bound to one configuration. One run per
/// target; no state is shared between runs.
#[derive(Debug)]
pub struct Pipeline {
    config: FirstbootConfig,
    mutations: Vec<Mutation>,
}

impl Pipeline {
    /// Bind a mutation sequence to a configuration.
    pub fn new(config: FirstbootConfig, mutations: Vec<Mutation>) -> Self {
        Self { config, mutations }
    }

    /// The stock P2V fixup set, mirroring the classic fix scripts:
    /// lock root's password, point the mount table at a RAM root,
    /// add a Xen console getty, and relocate the root into RAM.
    pub fn default_p2v(config: FirstbootConfig) -> Self {
        let target = config.target.clone();
        let mutations = vec![
            Mutation::DisablePassword {
                account: "root".into(),
            },
            Mutation::RewriteFstab {
                entries: vec![
                    FstabEntry::new("tmpfs", "/", "tmpfs", "defaults"),
                    FstabEntry::new("proc", "/proc", "proc", "defaults"),
                ],
            },
            Mutation::AppendInittab {
                entry: InittabEntry {
                    id: "X0".into(),
                    runlevels: "12345".into(),
                    action: "respawn".into(),
                    process: "/sbin/getty 38400 xvc0".into(),
                },
                only_if_hypervisor: Some("xen".into()),
            },
            Mutation::RelocateTree {
                mount_point: target,
                size_limit: None,
            },
        ];
        Self::new(config, mutations)
    }

    /// The bound mutation sequence, in application order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Validate the target, then apply each mutation in order. Stops at
    /// the first failure; no rollback.
    pub fn run(&self, fs: &dyn FsOps) -> Result<(), PipelineError> {
        guard::validate(fs, &self.config.target)?;
        for (index, mutation) in self.mutations.iter().enumerate() {
            let kind = mutation.kind();
            tracing::info!("Applying mutation {index} ({kind})");
            mutation
                .apply(fs, &self.config)
                .map_err(|source| PipelineError::Mutation {
                    index,
                    kind,
                    source,
                })?;
        }
        tracing::info!("Applied {} mutations to {}", self.mutations.len(), self.config.target);
        Ok(())
    }
}
