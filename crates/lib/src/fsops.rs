//! Filesystem capability layer.
//!
//! All mutations and guards go through the [`FsOps`] trait rather than
//! touching the host directly. Production uses [`HostFs`]; tests use an
//! in-memory fake so ordering and idempotence properties can be checked
//! without real mounts.

use std::io::{self, Write as _};
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use camino::Utf8Path;

/// The set of filesystem operations the fixup pipeline is allowed to
/// perform against a target root.
pub trait FsOps {
    /// Whether the path exists at all.
    fn exists(&self, path: &Utf8Path) -> bool;
    /// Whether the path exists and is a directory.
    fn is_dir(&self, path: &Utf8Path) -> bool;
    /// The device identity of the filesystem backing `path`, for
    /// mount-identity comparisons.
    fn device_of(&self, path: &Utf8Path) -> io::Result<u64>;
    /// Whether `path` is backed by a memory (tmpfs) filesystem.
    fn is_memory_backed(&self, path: &Utf8Path) -> io::Result<bool>;
    /// Read an entire file as UTF-8.
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String>;
    /// Replace the contents of a file, creating it if needed.
    fn write(&self, path: &Utf8Path, contents: &str) -> io::Result<()>;
    /// Append a single line (a trailing newline is added) to an existing
    /// file. A missing terminal newline on the current contents is
    /// repaired first so the new line never merges with the last one.
    fn append_line(&self, path: &Utf8Path, line: &str) -> io::Result<()>;
    /// Create a directory and any missing parents.
    fn create_dir_all(&self, path: &Utf8Path) -> io::Result<()>;
    /// Recursively copy the contents of `from` into the existing
    /// directory `to`, preserving modes, ownership and symlinks.
    fn copy_tree(&self, from: &Utf8Path, to: &Utf8Path) -> io::Result<()>;
    /// Mount a fresh tmpfs at `target` with the given size cap (bytes)
    /// and mode.
    fn mount_tmpfs(&self, target: &Utf8Path, size_limit: Option<u64>, mode: u32) -> io::Result<()>;
    /// Unmount the filesystem mounted at `target`.
    fn unmount(&self, target: &Utf8Path) -> io::Result<()>;
    /// Atomically move the mount at `from` onto `to`.
    fn move_mount(&self, from: &Utf8Path, to: &Utf8Path) -> io::Result<()>;
}

/// The real host filesystem, via std and rustix.
#[derive(Debug, Default)]
pub struct HostFs;

impl FsOps for HostFs {
    fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().symlink_metadata().is_ok()
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        path.as_std_path().is_dir()
    }

    fn device_of(&self, path: &Utf8Path) -> io::Result<u64> {
        let st = rustix::fs::stat(path.as_std_path())?;
        Ok(st.st_dev)
    }

    fn is_memory_backed(&self, path: &Utf8Path) -> io::Result<bool> {
        let st = rustix::fs::statfs(path.as_std_path())?;
        Ok(st.f_type == libc::TMPFS_MAGIC)
    }

    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Utf8Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn append_line(&self, path: &Utf8Path, line: &str) -> io::Result<()> {
        let current = std::fs::read_to_string(path)?;
        let mut f = std::fs::OpenOptions::new().append(true).open(path)?;
        if !current.is_empty() && !current.ends_with('\n') {
            writeln!(f)?;
        }
        writeln!(f, "{line}")
    }

    fn create_dir_all(&self, path: &Utf8Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy_tree(&self, from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
        copy_tree_recurse(from.as_std_path(), to.as_std_path())
    }

    fn mount_tmpfs(&self, target: &Utf8Path, size_limit: Option<u64>, mode: u32) -> io::Result<()> {
        let data = match size_limit {
            Some(size) => format!("size={size},mode={mode:04o}"),
            None => format!("mode={mode:04o}"),
        };
        let data = std::ffi::CString::new(data).map_err(io::Error::other)?;
        rustix::mount::mount(
            "tmpfs",
            target.as_std_path(),
            "tmpfs",
            rustix::mount::MountFlags::empty(),
            data.as_c_str(),
        )?;
        Ok(())
    }

    fn unmount(&self, target: &Utf8Path) -> io::Result<()> {
        rustix::mount::unmount(target.as_std_path(), rustix::mount::UnmountFlags::empty())?;
        Ok(())
    }

    fn move_mount(&self, from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
        rustix::mount::mount_move(from.as_std_path(), to.as_std_path())?;
        Ok(())
    }
}

/// Copy one directory level, preserving mode and ownership the way
/// `cp -a` does. Hard links are not detected; they come across as
/// independent copies.
fn copy_tree_recurse(from: &Path, to: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let ft = entry.file_type()?;
        let src = entry.path();
        let dest = to.join(entry.file_name());
        if ft.is_dir() {
            let meta = entry.metadata()?;
            std::fs::create_dir(&dest)?;
            std::fs::set_permissions(&dest, meta.permissions())?;
            std::os::unix::fs::lchown(&dest, Some(meta.uid()), Some(meta.gid()))?;
            copy_tree_recurse(&src, &dest)?;
        } else if ft.is_symlink() {
            let link = std::fs::read_link(&src)?;
            std::os::unix::fs::symlink(&link, &dest)?;
            let meta = std::fs::symlink_metadata(&src)?;
            std::os::unix::fs::lchown(&dest, Some(meta.uid()), Some(meta.gid()))?;
        } else if ft.is_file() {
            let meta = entry.metadata()?;
            std::fs::copy(&src, &dest)?;
            std::os::unix::fs::lchown(&dest, Some(meta.uid()), Some(meta.gid()))?;
        } else if ft.is_socket() {
            // Nothing meaningful to copy for a socket
            tracing::debug!("Skipping socket {}", src.display());
        } else {
            // Device node or FIFO
            let meta = entry.metadata()?;
            let kind = if ft.is_char_device() {
                rustix::fs::FileType::CharacterDevice
            } else if ft.is_block_device() {
                rustix::fs::FileType::BlockDevice
            } else {
                rustix::fs::FileType::Fifo
            };
            rustix::fs::mknodat(
                rustix::fs::CWD,
                &dest,
                kind,
                rustix::fs::Mode::from_bits_truncate(meta.mode() & 0o7777),
                meta.rdev(),
            )?;
            std::os::unix::fs::lchown(&dest, Some(meta.uid()), Some(meta.gid()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::*;

    #[test]
    fn test_hostfs_roundtrip() -> io::Result<()> {
        let td = tempfile::tempdir()?;
        let root = Utf8Path::from_path(td.path()).unwrap();
        let fs = HostFs;
        let file = root.join("etc/fstab");
        fs.create_dir_all(file.parent().unwrap())?;
        fs.write(&file, "a b c d 0 0\n")?;
        fs.append_line(&file, "x y z w 0 0")?;
        assert_eq!(fs.read_to_string(&file)?, "a b c d 0 0\nx y z w 0 0\n");
        assert!(fs.exists(&file));
        assert!(fs.is_dir(root));
        assert_eq!(fs.device_of(root)?, fs.device_of(&file)?);
        Ok(())
    }

    #[test]
    fn test_hostfs_append_line_semantics() -> io::Result<()> {
        let td = tempfile::tempdir()?;
        let root = Utf8Path::from_path(td.path()).unwrap();
        let fs = HostFs;
        assert_eq!(
            fs.append_line(&root.join("missing"), "x").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        // No newline on the last line; append must not merge with it
        let file = root.join("inittab");
        fs.write(&file, "1:2345:respawn:/sbin/getty tty1")?;
        fs.append_line(&file, "X0:12345:respawn:/sbin/getty 38400 xvc0")?;
        assert_eq!(
            fs.read_to_string(&file)?,
            "1:2345:respawn:/sbin/getty tty1\nX0:12345:respawn:/sbin/getty 38400 xvc0\n"
        );
        Ok(())
    }

    #[test]
    fn test_hostfs_copy_tree() -> io::Result<()> {
        let src = tempfile::tempdir()?;
        let dest = tempfile::tempdir()?;
        let src_root = Utf8Path::from_path(src.path()).unwrap();
        let dest_root = Utf8Path::from_path(dest.path()).unwrap();
        let fs = HostFs;
        fs.create_dir_all(&src_root.join("etc"))?;
        fs.write(&src_root.join("etc/fstab"), "tmpfs / tmpfs defaults 0 0\n")?;
        std::os::unix::fs::symlink("etc/fstab", src_root.join("link"))?;
        fs.copy_tree(src_root, dest_root)?;
        assert_eq!(
            fs.read_to_string(&dest_root.join("etc/fstab"))?,
            "tmpfs / tmpfs defaults 0 0\n"
        );
        assert_eq!(
            std::fs::read_link(dest_root.join("link"))?,
            std::path::Path::new("etc/fstab")
        );
        Ok(())
    }
}
