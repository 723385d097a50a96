//! `shadow(5)` entries: nine colon-separated fields, of which we only
//! interpret the account name and the password. The aging fields are
//! carried through verbatim so a rewrite is byte-faithful.

use std::fmt::Display;

use anyhow::{anyhow, Result};

/// One line of a shadow database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowEntry {
    /// Account name.
    pub name: String,
    /// The hashed password field.
    pub password: String,
    /// The remaining seven aging/expiry fields, uninterpreted.
    pub aging: Vec<String>,
}

impl ShadowEntry {
    /// Whether the password is disabled in the `passwd -l` sense.
    pub fn is_locked(&self) -> bool {
        self.password.starts_with('!')
    }

    /// Disable the password, keeping the account itself. No-op when
    /// already locked.
    pub fn lock(&mut self) {
        if !self.is_locked() {
            self.password.insert(0, '!');
        }
    }
}

impl Display for ShadowEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.password, self.aging.join(":"))
    }
}

/// Parse a single shadow line.
pub fn parse_shadow_line(line: &str) -> Result<ShadowEntry> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() != 9 || fields[0].is_empty() {
        return Err(anyhow!("Malformed shadow entry"));
    }
    Ok(ShadowEntry {
        name: fields[0].to_string(),
        password: fields[1].to_string(),
        aging: fields[2..].iter().map(|s| s.to_string()).collect(),
    })
}

/// Lock `account`'s password in a whole shadow file. Returns `None`
/// when the account has no entry; otherwise the (possibly unchanged)
/// new file contents.
pub fn lock_account(content: &str, account: &str) -> Result<Option<String>> {
    let mut found = false;
    let mut out = String::new();
    for line in content.lines() {
        if line.split(':').next() == Some(account) {
            let mut entry = parse_shadow_line(line)?;
            found = true;
            entry.lock();
            out.push_str(&entry.to_string());
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    Ok(found.then_some(out))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use similar_asserts::assert_eq;

    use super::*;

    const SAMPLE: &str = indoc! {"
        root:$6$saltsalt$hashhash:19000:0:99999:7:::
        daemon:*:19000:0:99999:7:::
        user:!alreadylocked:19000:0:99999:7:::
    "};

    #[test]
    fn test_parse_entry() -> Result<()> {
        let entry = parse_shadow_line("root:$6$s$h:19000:0:99999:7:::")?;
        assert_eq!(entry.name, "root");
        assert_eq!(entry.password, "$6$s$h");
        assert_eq!(entry.aging.len(), 7);
        assert!(!entry.is_locked());
        Ok(())
    }

    #[test]
    fn test_parse_malformed() {
        for line in ["", "root", "root:x:1:2:3", ":x:1:2:3:4:5:6:7"] {
            assert!(parse_shadow_line(line).is_err(), "{line}");
        }
    }

    #[test]
    fn test_lock_account() -> Result<()> {
        let locked = lock_account(SAMPLE, "root")?.unwrap();
        assert!(locked.contains("root:!$6$saltsalt$hashhash:"));
        // Other entries untouched
        assert!(locked.contains("daemon:*:"));
        Ok(())
    }

    #[test]
    fn test_lock_is_idempotent() -> Result<()> {
        let once = lock_account(SAMPLE, "root")?.unwrap();
        let twice = lock_account(&once, "root")?.unwrap();
        assert_eq!(once, twice);
        // An entry locked in the source stays as-is
        let same = lock_account(SAMPLE, "user")?.unwrap();
        assert_eq!(same, SAMPLE);
        Ok(())
    }

    #[test]
    fn test_lock_missing_account() -> Result<()> {
        assert!(lock_account(SAMPLE, "nobody")?.is_none());
        Ok(())
    }
}
