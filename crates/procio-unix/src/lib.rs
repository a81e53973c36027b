//! Unix-specific functionality for procio.
//!
//! This crate is only functional on Unix platforms.

#![cfg(unix)]

mod descriptor;
mod memfd;

pub use descriptor::duplicate_fd;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use memfd::create_memfd;
pub use memfd::{MemfdError, memfd_supported};
