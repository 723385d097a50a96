//! `fstab(5)`-style mount table entries: six whitespace-separated
//! fields (device, mountpoint, type, options, dump, pass).

use std::fmt::Display;

use anyhow::{anyhow, Result};
use serde::Deserialize;

/// One line of a mount table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FstabEntry {
    /// Block device, label, or pseudo-device (e.g. `tmpfs`).
    pub device: String,
    /// Where it gets mounted.
    pub mountpoint: String,
    /// Filesystem type.
    pub fstype: String,
    /// Comma-separated mount options.
    pub options: String,
    /// `dump(8)` field; nearly always 0.
    #[serde(default)]
    pub dump: u32,
    /// `fsck` ordering field.
    #[serde(default)]
    pub pass: u32,
}

impl FstabEntry {
    /// Convenience constructor for fully-specified entries.
    pub fn new(
        device: impl Into<String>,
        mountpoint: impl Into<String>,
        fstype: impl Into<String>,
        options: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            mountpoint: mountpoint.into(),
            fstype: fstype.into(),
            options: options.into(),
            dump: 0,
            pass: 0,
        }
    }
}

impl Display for FstabEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.device, self.mountpoint, self.fstype, self.options, self.dump, self.pass
        )
    }
}

/// Parse a whole mount table, skipping blank lines and comments.
pub fn parse_fstab(input: &str) -> Result<Vec<FstabEntry>> {
    let mut entries = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        // dump and pass may be omitted and default to 0
        if !(4..=6).contains(&fields.len()) {
            return Err(anyhow!("Malformed fstab line: {line:?}"));
        }
        let numeric = |idx: usize| -> Result<u32> {
            match fields.get(idx) {
                Some(v) => v.parse().map_err(|_| anyhow!("Malformed fstab line: {line:?}")),
                None => Ok(0),
            }
        };
        entries.push(FstabEntry {
            device: fields[0].to_string(),
            mountpoint: fields[1].to_string(),
            fstype: fields[2].to_string(),
            options: fields[3].to_string(),
            dump: numeric(4)?,
            pass: numeric(5)?,
        });
    }
    Ok(entries)
}

/// Render entries back into file contents, one line each plus a
/// trailing newline.
pub fn render_fstab(entries: &[FstabEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}
