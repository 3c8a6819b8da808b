//! Process privilege detection and memory locking
//!
//! Reconfiguring devices needs elevated rights on every supported platform.
//! The server only reports what it has; it never changes its own privileges.

use tracing::{debug, info, warn};

/// Privilege level of the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// Effective user is root
    Root,
    /// Running as regular user
    User,
    /// Unknown privilege level
    Unknown,
}

impl PrivilegeLevel {
    /// Detect current privilege level
    pub fn detect() -> Self {
        #[cfg(unix)]
        {
            let euid = unsafe { libc::geteuid() };
            if euid == 0 {
                return Self::Root;
            }
            Self::User
        }

        #[cfg(not(unix))]
        {
            Self::Unknown
        }
    }

    /// Check if elevated
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::User => write!(f, "user"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lock process memory so key material is never swapped out.
///
/// Best effort: returns whether memory is now locked.
#[cfg(all(unix, not(target_os = "macos")))]
pub fn lock_memory() -> bool {
    debug!("Locking memory to prevent swapping");

    let result = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        warn!("Failed to lock memory: {}", err);
        return false;
    }

    info!("Memory locked");
    true
}

/// Lock memory (unsupported here)
#[cfg(any(not(unix), target_os = "macos"))]
pub fn lock_memory() -> bool {
    debug!("Memory locking not supported on this platform");
    false
}
