//! Locking process memory into RAM
//!
//! Page faults in the audio callback cause dropouts. Locking current and
//! future pages avoids them; failure only degrades timing.

use std::io;

/// `mlockall(MCL_CURRENT | MCL_FUTURE)`
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn lock_all() -> io::Result<()> {
    // SAFETY: mlockall takes no pointers and only affects this process.
    let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn lock_all() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "memory locking is not supported on this platform",
    ))
}
