use std::fmt;

/// The index of a stream within a spawn request.
///
/// Slot `0` feeds the child; every other slot receives output from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(usize);

impl Slot {
    pub const STDIN: Self = Self(0);
    pub const STDOUT: Self = Self(1);
    pub const STDERR: Self = Self(2);

    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    /// Returns `true` if the child reads from this slot.
    pub const fn is_input(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the child writes to this slot.
    pub const fn is_output(self) -> bool {
        self.0 != 0
    }

    /// The name given to an anonymous memory file backing this slot.
    ///
    /// Only visible in diagnostics, e.g., `/proc/<pid>/fd`.
    pub const fn memfd_label(self) -> &'static str {
        match self.0 {
            0 => "stdin",
            1 => "stdout",
            2 => "stderr",
            _ => "memory-file",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("stdin"),
            1 => f.write_str("stdout"),
            2 => f.write_str("stderr"),
            index => write!(f, "stdio[{index}]"),
        }
    }
}
