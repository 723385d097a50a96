//! Runtime configuration.
//!
//! The original fix scripts were driven by ad-hoc environment
//! variables; here that surface is collected once into an explicit
//! struct handed to the guard and pipeline, with the environment read
//! in exactly one place.

use anyhow::{anyhow, Context, Result};
use camino::Utf8PathBuf;
use fn_error_context::context;
use serde::Deserialize;

use crate::mutation::Mutation;

/// Environment variable naming the mounted target root.
pub const TARGET_ENV: &str = "TARGET";
/// Environment variable naming the active hypervisor mode (e.g. `xen`).
pub const HYPERVISOR_ENV: &str = "P2V_HYPERVISOR";
/// Environment variable capping the size of RAM-backed volumes,
/// either plain bytes or with a `K`/`M`/`G`/`T` suffix.
pub const TMPFS_SIZE_ENV: &str = "P2V_TMPFS_SIZE";

/// Everything a pipeline run needs to know about its invocation.
#[derive(Debug, Clone, Default)]
pub struct FirstbootConfig {
    /// The target root. May be empty when unset; the guard rejects that
    /// before anything else happens.
    pub target: Utf8PathBuf,
    /// Active hypervisor mode, gating conditional mutations.
    pub hypervisor_mode: Option<String>,
    /// Default size cap in bytes for RAM-backed volumes.
    pub size_limit_bytes: Option<u64>,
}

impl FirstbootConfig {
    /// Build a configuration from the process environment. An unset
    /// `TARGET` yields an empty path here rather than an error; the
    /// guard owns that rejection so it happens before any mutation.
    #[context("Reading configuration from environment")]
    pub fn from_env() -> Result<Self> {
        let target = std::env::var(TARGET_ENV).unwrap_or_default().into();
        let hypervisor_mode = std::env::var(HYPERVISOR_ENV).ok().filter(|v| !v.is_empty());
        let size_limit_bytes = match std::env::var(TMPFS_SIZE_ENV) {
            Ok(v) if !v.is_empty() => {
                Some(parse_size(&v).with_context(|| format!("Parsing {TMPFS_SIZE_ENV}"))?)
            }
            _ => None,
        };
        Ok(Self {
            target,
            hypervisor_mode,
            size_limit_bytes,
        })
    }
}

/// Parse a size in bytes with an optional binary `K`/`M`/`G`/`T`
/// suffix, the same shapes `mount -o size=` accepts.
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let (digits, shift) = match s.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => {
            let shift = match c.to_ascii_uppercase() {
                'K' => 10,
                'M' => 20,
                'G' => 30,
                'T' => 40,
                other => return Err(anyhow!("Unknown size suffix {other:?} in {s:?}")),
            };
            (&s[..idx], shift)
        }
        Some(_) => (s, 0),
        None => return Err(anyhow!("Empty size")),
    };
    let n: u64 = digits
        .parse()
        .map_err(|_| anyhow!("Invalid size value {s:?}"))?;
    n.checked_shl(shift)
        .filter(|_| n.leading_zeros() >= shift)
        .ok_or_else(|| anyhow!("Size {s:?} overflows"))
}

/// An externally supplied pipeline, loaded from TOML. Used in place of
/// the built-in P2V mutation set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineFile {
    /// Hypervisor mode override; the environment wins when set there.
    #[serde(default)]
    pub hypervisor_mode: Option<String>,
    /// Size cap override for RAM-backed volumes.
    #[serde(default)]
    pub size_limit: Option<String>,
    /// The ordered mutation sequence.
    pub mutations: Vec<Mutation>,
}

/// Parse a TOML pipeline description.
#[context("Parsing pipeline file")]
pub fn parse_pipeline_file(content: &str) -> Result<PipelineFile> {
    Ok(toml::from_str(content)?)
}
