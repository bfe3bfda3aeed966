use super::{Error, Result};
use std::io::BufRead;
use std::num::NonZeroU64;
use std::path::Path;
use std::{env, fs};

use crate::fsutil;

/// Returns the kernel's USER_HZ, the tick rate of `/proc/stat`.
///
/// # Errors
///
/// Returns [`Error::UserHz`] if `sysconf` fails or reports a non-positive rate.
#[cfg(unix)]
pub fn query_user_hz() -> Result<NonZeroU64> {
    // SAFETY: sysconf has no preconditions and _SC_CLK_TCK is a valid name.
    let value = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    u64::try_from(value)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or(Error::UserHz { value })
}

#[cfg(not(unix))]
pub fn query_user_hz() -> Result<NonZeroU64> {
    Err(Error::UserHz { value: 0 })
}

/// Returns true if `/proc/self/cgroup` under `rootfs` names a container runtime.
///
/// # Errors
///
/// * [`Error::FileOpen`] if the file cannot be opened.
/// * [`Error::ReadLine`] if a line from the file cannot be read.
pub fn matches_container_cgroup(rootfs: impl AsRef<Path>) -> Result<bool> {
    let path = rootfs.as_ref().join("proc/self/cgroup");
    let mut buf = fsutil::open_file_reader(&path)?;

    let mut line = String::with_capacity(256);
    while buf
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: path.clone(),
            source,
        })?
        != 0
    {
        if is_container_cgroup_line(&line) {
            return Ok(true);
        }
        line.clear();
    }

    Ok(false)
}

/// Returns true for a `<hierarchy-id>:<controllers>:<path>` line whose path belongs to a
/// container, either by runtime name or by a 64-character container id.
pub fn is_container_cgroup_line(line: &str) -> bool {
    const RUNTIME_MARKERS: [&str; 4] = ["docker", "kubepods", "containerd", "libpod"];

    RUNTIME_MARKERS.iter().any(|marker| line.contains(marker))
        || line
            .trim_end()
            .split('/')
            .any(|part| part.len() >= 32 && is_non_empty_hex_string(part))
}

/// Returns true if marker files or variables under `rootfs` suggest a container.
pub fn has_container_indicators(rootfs: impl AsRef<Path>) -> bool {
    let rootfs = rootfs.as_ref();
    fs::metadata(rootfs.join(".dockerenv")).is_ok()
        || fs::metadata(rootfs.join("run/.containerenv")).is_ok()
        || env::var("container").is_ok()
}

/// Returns true if the input string is not empty and contains only ASCII hex digits.
pub fn is_non_empty_hex_string(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_is_hex_string() {
        assert!(is_non_empty_hex_string("deadbeef12345678"));
        assert!(!is_non_empty_hex_string("deadbeefXYZ"));
        assert!(!is_non_empty_hex_string(""));
    }

    #[test]
    fn test_container_cgroup_lines() {
        assert!(is_container_cgroup_line(
            "12:memory:/docker/4f3c2a1b0e9d8c7b6a5f4e3d2c1b0a9f8e7d6c5b4a3f2e1d0c9b8a7f6e5d4c3b\n"
        ));
        assert!(is_container_cgroup_line(
            "4:cpu,cpuacct:/kubepods/burstable/pod1234/abc\n"
        ));
        assert!(!is_container_cgroup_line("0::/init.scope\n"));
        assert!(!is_container_cgroup_line("3:cpuset:/\n"));
    }

    #[test]
    fn test_matches_container_cgroup_reads_rootfs() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("proc/self")).unwrap();
        let mut file = fs::File::create(root.path().join("proc/self/cgroup")).unwrap();
        writeln!(file, "5:memory:/user.slice").unwrap();
        writeln!(file, "4:cpu,cpuacct:/system.slice/containerd.service").unwrap();

        assert!(matches_container_cgroup(root.path()).unwrap());
    }

    #[test]
    fn test_matches_container_cgroup_missing_file() {
        let root = tempfile::tempdir().unwrap();
        let err = matches_container_cgroup(root.path()).unwrap_err();
        assert!(matches!(err, Error::FileOpen(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_query_user_hz() {
        assert!(query_user_hz().unwrap().get() > 0);
    }
}
