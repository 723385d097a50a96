//! Conditional init table append, e.g. a hypervisor console getty.

use super::MutationError;
use crate::config::FirstbootConfig;
use crate::fsops::FsOps;
use crate::parsers::inittab::InittabEntry;

const INITTAB_PATH: &str = "etc/inittab";

pub(super) fn apply(
    fs: &dyn FsOps,
    config: &FirstbootConfig,
    entry: &InittabEntry,
    only_if_hypervisor: Option<&str>,
) -> Result<(), MutationError> {
    if let Some(want) = only_if_hypervisor {
        if config.hypervisor_mode.as_deref() != Some(want) {
            tracing::debug!(
                "Skipping inittab entry {}: hypervisor mode is {:?}, not {want}",
                entry.id,
                config.hypervisor_mode
            );
            return Ok(());
        }
    }
    let path = config.target.join(INITTAB_PATH);
    let content = fs
        .read_to_string(&path)
        .map_err(|_| MutationError::MissingTargetFile { path: path.clone() })?;
    let line = entry.to_string();
    // Presence check keeps re-runs from stacking duplicate entries
    if content.lines().any(|l| l.trim() == line) {
        tracing::debug!("Inittab already contains {}", entry.id);
        return Ok(());
    }
    fs.append_line(&path, &line)
        .map_err(|source| MutationError::WriteFailed { path, source })?;
    tracing::info!("Appended inittab entry {}", entry.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::fsops::memfs::MemFs;

    const BASE: &str = "id:2:initdefault:\n1:2345:respawn:/sbin/getty 38400 tty1\n";

    fn console_entry() -> InittabEntry {
        InittabEntry {
            id: "X0".into(),
            runlevels: "12345".into(),
            action: "respawn".into(),
            process: "/sbin/getty 38400 xvc0".into(),
        }
    }

    fn fixture(hypervisor: Option<&str>) -> (MemFs, FirstbootConfig) {
        let fs = MemFs::new();
        fs.add_mount("/target");
        fs.add_file("/target/etc/inittab", BASE);
        let config = FirstbootConfig {
            target: Utf8PathBuf::from("/target"),
            hypervisor_mode: hypervisor.map(Into::into),
            size_limit_bytes: None,
        };
        (fs, config)
    }

    #[test]
    fn test_appends_when_condition_holds() {
        let (fs, config) = fixture(Some("xen"));
        apply(&fs, &config, &console_entry(), Some("xen")).unwrap();
        let content = fs.contents("/target/etc/inittab").unwrap();
        assert!(content.ends_with("X0:12345:respawn:/sbin/getty 38400 xvc0\n"));
    }

    #[test]
    fn test_skips_when_condition_fails() {
        for mode in [None, Some("kvm")] {
            let (fs, config) = fixture(mode);
            apply(&fs, &config, &console_entry(), Some("xen")).unwrap();
            assert_eq!(fs.contents("/target/etc/inittab").as_deref(), Some(BASE));
        }
    }

    #[test]
    fn test_no_duplicate_on_rerun() {
        let (fs, config) = fixture(Some("xen"));
        apply(&fs, &config, &console_entry(), Some("xen")).unwrap();
        apply(&fs, &config, &console_entry(), Some("xen")).unwrap();
        let content = fs.contents("/target/etc/inittab").unwrap();
        assert_eq!(content.matches("X0:").count(), 1);
    }

    #[test]
    fn test_append_after_unterminated_last_line() {
        let (fs, config) = fixture(Some("xen"));
        fs.add_file("/target/etc/inittab", BASE.trim_end());
        apply(&fs, &config, &console_entry(), Some("xen")).unwrap();
        apply(&fs, &config, &console_entry(), Some("xen")).unwrap();
        let content = fs.contents("/target/etc/inittab").unwrap();
        assert!(content.ends_with("tty1\nX0:12345:respawn:/sbin/getty 38400 xvc0\n"));
        assert_eq!(content.matches("X0:").count(), 1);
    }

    #[test]
    fn test_unconditional_append() {
        let (fs, config) = fixture(None);
        apply(&fs, &config, &console_entry(), None).unwrap();
        assert!(fs
            .contents("/target/etc/inittab")
            .unwrap()
            .contains("X0:12345"));
    }

    #[test]
    fn test_missing_inittab() {
        let fs = MemFs::new();
        fs.add_mount("/target");
        let config = FirstbootConfig {
            target: Utf8PathBuf::from("/target"),
            hypervisor_mode: None,
            size_limit_bytes: None,
        };
        let err = apply(&fs, &config, &console_entry(), None).unwrap_err();
        assert!(matches!(err, MutationError::MissingTargetFile { .. }));
    }
}
