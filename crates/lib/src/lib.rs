//! # P2V first-boot image customization
//!
//! This crate implements the one-shot filesystem fixups applied to a
//! physical-to-virtual migrated OS image on first boot: validating that
//! the supplied target is a real, non-root mount, then applying an
//! ordered sequence of idempotent mutations (lock a password, rewrite
//! the mount table, add a hypervisor console entry, relocate the root
//! into RAM) and aborting on the first failure.

pub mod cli;
pub mod config;
pub mod fsops;
pub mod guard;
pub mod mutation;
pub mod parsers;
pub mod pipeline;
pub mod verify;

pub use config::FirstbootConfig;
pub use fsops::{FsOps, HostFs};
pub use mutation::{Mutation, MutationError};
pub use pipeline::{Pipeline, PipelineError};
