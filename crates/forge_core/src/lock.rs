//! Exclusive run lock on the test directory.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

pub const LOCK_FILE: &str = ".testforge.lock";

/// Held for the lifetime of a run; the lock file is removed on drop.
///
/// The file holds the owner's PID. A lock left behind by a process that no
/// longer exists is taken over.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Create `<dir>/.testforge.lock`, failing with [`CoreError::LockHeld`]
    /// when a live run holds it.
    pub fn acquire(dir: &Path) -> CoreResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE);

        let mut file = match create_exclusive(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(&path) {
                    return Err(CoreError::LockHeld(path));
                }
                warn!("Removing stale run lock {:?}", path);
                fs::remove_file(&path)?;
                // Lost a race with another run reclaiming the same lock
                match create_exclusive(&path) {
                    Ok(file) => file,
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        return Err(CoreError::LockHeld(path));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        debug!("Acquired run lock {:?}", path);

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove run lock {:?}: {}", self.path, e);
        }
    }
}

fn create_exclusive(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// A lock is stale when its owner PID is unparseable or not running.
/// An empty file is a lock still being written and counts as held.
fn is_stale(path: &Path) -> bool {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        // Vanished between the create attempt and this read
        Err(e) if e.kind() == ErrorKind::NotFound => return true,
        Err(_) => return false,
    };
    let content = content.trim();
    if content.is_empty() {
        return false;
    }
    match content.parse::<u32>() {
        Ok(pid) => !process_alive(pid),
        Err(_) => true,
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use std::process::{Command, Stdio};

    if pid == std::process::id() {
        return true;
    }
    if Path::new("/proc/self").exists() {
        return Path::new("/proc").join(pid.to_string()).exists();
    }
    // No procfs: ask the shell. Unknown answers keep the lock.
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let temp = tempdir().unwrap();

        let lock = RunLock::acquire(temp.path()).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(RunLock::acquire(temp.path()), Err(CoreError::LockHeld(_))));

        drop(lock);
        assert!(!temp.path().join(LOCK_FILE).exists());
        assert!(RunLock::acquire(temp.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_of_dead_process_is_taken_over() {
        let temp = tempdir().unwrap();
        // Above the kernel's PID ceiling, so never a live process
        fs::write(temp.path().join(LOCK_FILE), "4294967\n").unwrap();

        let lock = RunLock::acquire(temp.path()).unwrap();

        assert_eq!(
            fs::read_to_string(lock.path()).unwrap().trim(),
            std::process::id().to_string()
        );
    }

    #[test]
    fn test_garbage_lock_is_taken_over() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(LOCK_FILE), "not-a-pid").unwrap();

        assert!(RunLock::acquire(temp.path()).is_ok());
    }

    #[test]
    fn test_lock_of_live_process_is_held() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(LOCK_FILE), std::process::id().to_string()).unwrap();

        assert!(matches!(RunLock::acquire(temp.path()), Err(CoreError::LockHeld(_))));
        assert!(temp.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_empty_lock_is_held() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(LOCK_FILE), "").unwrap();

        assert!(matches!(RunLock::acquire(temp.path()), Err(CoreError::LockHeld(_))));
    }
}
