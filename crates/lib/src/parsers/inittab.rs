//! `inittab(5)` entries: four colon-separated fields
//! (id, runlevels, action, process). The process field may itself
//! contain colons.

use std::fmt::Display;

use anyhow::{anyhow, Result};
use serde::Deserialize;

/// One line of an init table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InittabEntry {
    /// Short unique identifier (1-4 characters traditionally).
    pub id: String,
    /// Runlevels the entry applies to, e.g. `2345`.
    pub runlevels: String,
    /// What init should do, e.g. `respawn`.
    pub action: String,
    /// The command to run.
    pub process: String,
}

impl Display for InittabEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.id, self.runlevels, self.action, self.process
        )
    }
}

/// Parse a single non-comment inittab line.
pub fn parse_inittab_line(line: &str) -> Result<InittabEntry> {
    let mut fields = line.splitn(4, ':');
    let mut next = || {
        fields
            .next()
            .ok_or_else(|| anyhow!("Malformed inittab line: {line:?}"))
    };
    let entry = InittabEntry {
        id: next()?.to_string(),
        runlevels: next()?.to_string(),
        action: next()?.to_string(),
        process: next()?.to_string(),
    };
    if entry.id.is_empty() || entry.action.is_empty() {
        return Err(anyhow!("Malformed inittab line: {line:?}"));
    }
    Ok(entry)
}
