//! Platform descriptor types.
//!
//! On Unix a descriptor is a file descriptor; on Windows it is a `HANDLE`. Both are owned through
//! the standard library's I/O-safety types, so a descriptor is closed exactly once, when its owner
//! drops it.

#[cfg(unix)]
pub use std::os::fd::{OwnedFd as OwnedDescriptor, RawFd as RawDescriptor};
#[cfg(windows)]
pub use std::os::windows::io::{OwnedHandle as OwnedDescriptor, RawHandle as RawDescriptor};

use crate::Slot;

/// Return the raw value of an owned descriptor, without giving up ownership.
pub(crate) fn as_raw(descriptor: &OwnedDescriptor) -> RawDescriptor {
    #[cfg(unix)]
    {
        use std::os::fd::AsRawFd;
        descriptor.as_raw_fd()
    }
    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawHandle;
        descriptor.as_raw_handle()
    }
}

/// Give up ownership of a descriptor without closing it.
pub(crate) fn forget(descriptor: OwnedDescriptor) {
    #[cfg(unix)]
    {
        use std::os::fd::IntoRawFd;
        let _ = descriptor.into_raw_fd();
    }
    #[cfg(windows)]
    {
        use std::os::windows::io::IntoRawHandle;
        let _ = descriptor.into_raw_handle();
    }
}

/// One of the current process's own standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    /// Identify a descriptor number that aliases one of our standard streams.
    pub fn from_raw(fd: i64) -> Option<Self> {
        match fd {
            0 => Some(Self::Stdin),
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            _ => None,
        }
    }

    /// The slot this stream occupies in a child that inherits it.
    pub fn slot(self) -> Slot {
        match self {
            Self::Stdin => Slot::STDIN,
            Self::Stdout => Slot::STDOUT,
            Self::Stderr => Slot::STDERR,
        }
    }

    /// Duplicate the descriptor backing this stream.
    pub fn duplicate(self) -> std::io::Result<OwnedDescriptor> {
        #[cfg(unix)]
        {
            use std::os::fd::AsFd;
            match self {
                Self::Stdin => std::io::stdin().as_fd().try_clone_to_owned(),
                Self::Stdout => std::io::stdout().as_fd().try_clone_to_owned(),
                Self::Stderr => std::io::stderr().as_fd().try_clone_to_owned(),
            }
        }
        #[cfg(windows)]
        {
            use std::os::windows::io::AsHandle;
            match self {
                Self::Stdin => std::io::stdin().as_handle().try_clone_to_owned(),
                Self::Stdout => std::io::stdout().as_handle().try_clone_to_owned(),
                Self::Stderr => std::io::stderr().as_handle().try_clone_to_owned(),
            }
        }
    }
}
