//! The parent's end of a piped stdio slot, after the child has been spawned.

use crate::descriptor::{as_raw, forget};
use crate::{OwnedDescriptor, RawDescriptor};

/// A descriptor registered for readiness notifications.
pub trait PollRegistration {
    /// The descriptor being polled.
    fn as_raw_descriptor(&self) -> RawDescriptor;

    /// Remove the registration, returning the descriptor without closing it.
    fn deregister(self) -> OwnedDescriptor;
}

#[cfg(all(unix, feature = "tokio"))]
impl PollRegistration for tokio::io::unix::AsyncFd<std::os::fd::OwnedFd> {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        use std::os::fd::AsRawFd;
        self.get_ref().as_raw_fd()
    }

    fn deregister(self) -> OwnedDescriptor {
        self.into_inner()
    }
}

/// A live handle for a piped slot: either registered with a poller, or a bare descriptor.
///
/// The transition to [`PollOrFd::Closed`] happens at most once and is never undone.
#[derive(Debug, Default)]
pub enum PollOrFd<P> {
    Poll(P),
    Fd(OwnedDescriptor),
    #[default]
    Closed,
}

impl<P: PollRegistration> PollOrFd<P> {
    /// The underlying descriptor, or `None` once closed.
    pub fn descriptor(&self) -> Option<RawDescriptor> {
        match self {
            Self::Poll(poll) => Some(poll.as_raw_descriptor()),
            Self::Fd(fd) => Some(as_raw(fd)),
            Self::Closed => None,
        }
    }

    /// The poll registration, if there is one.
    pub fn poll(&self) -> Option<&P> {
        match self {
            Self::Poll(poll) => Some(poll),
            Self::Fd(_) | Self::Closed => None,
        }
    }

    pub fn poll_mut(&mut self) -> Option<&mut P> {
        match self {
            Self::Poll(poll) => Some(poll),
            Self::Fd(_) | Self::Closed => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Close the handle, passing the descriptor to `on_closed` along with `context`.
    ///
    /// A poll registration is released first. The descriptor itself is not closed here:
    /// `on_closed` owns it and decides when to drop it, e.g., after draining buffered data. Once
    /// closed, further calls do nothing and `on_closed` is not invoked.
    pub fn close<C>(&mut self, context: C, on_closed: impl FnOnce(C, OwnedDescriptor)) {
        let fd = match std::mem::take(self) {
            Self::Closed => return,
            Self::Poll(poll) => poll.deregister(),
            Self::Fd(fd) => fd,
        };
        on_closed(context, fd);
    }

    /// Mark the handle closed after its descriptor was found to be invalid.
    ///
    /// The descriptor number is released without a close call, since it may already refer to
    /// another file.
    pub fn invalidate(&mut self) {
        match std::mem::take(self) {
            Self::Closed => {}
            Self::Poll(poll) => forget(poll.deregister()),
            Self::Fd(fd) => forget(fd),
        }
    }
}
