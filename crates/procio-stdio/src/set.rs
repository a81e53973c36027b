use tracing::debug;

use crate::{ProjectOptions, Slot, SpawnStdio, StreamSpec};

/// How a child process is going to be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnMode {
    /// The caller blocks until the child exits, and reads its output afterwards.
    pub is_sync: bool,
    /// The maximum number of bytes to collect from each piped output.
    pub max_buffer: Option<usize>,
    /// Allow stdio to be backed by anonymous memory files, where supported.
    pub memfd: bool,
}

impl Default for SpawnMode {
    fn default() -> Self {
        Self {
            is_sync: false,
            max_buffer: None,
            memfd: true,
        }
    }
}

/// The validated stdio of a spawn request, keyed by slot.
///
/// Always holds at least `stdin`, `stdout`, and `stderr`.
#[derive(Debug)]
pub struct StdioSet {
    specs: Vec<StreamSpec>,
    overlapped: Vec<Slot>,
}

impl StdioSet {
    /// Create a set from specs in slot order; missing standard slots inherit from the parent.
    pub fn new(specs: Vec<StreamSpec>) -> Self {
        Self::from_parts(specs, Vec::new())
    }

    pub(crate) fn from_parts(mut specs: Vec<StreamSpec>, overlapped: Vec<Slot>) -> Self {
        if specs.len() < 3 {
            specs.resize_with(3, StreamSpec::default);
        }
        Self { specs, overlapped }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, slot: Slot) -> Option<&StreamSpec> {
        self.specs.get(slot.index())
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut StreamSpec> {
        self.specs.get_mut(slot.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &StreamSpec)> {
        self.specs
            .iter()
            .enumerate()
            .map(|(index, spec)| (Slot::new(index), spec))
    }

    /// Returns `true` if the caller asked for an overlapped pipe on this slot.
    pub fn is_overlapped(&self, slot: Slot) -> bool {
        self.overlapped.contains(&slot)
    }

    /// Returns `true` if the spec at `slot` may be backed by an anonymous memory file under `mode`.
    ///
    /// A synchronous pipe only qualifies on an output slot, since an input pipe is fed by the
    /// parent while the child runs. A memory file can't enforce a size limit on what the child
    /// writes, so output pipes also only qualify when no `max_buffer` is set.
    pub fn can_use_memory_backed_buffer(&self, slot: Slot, mode: SpawnMode) -> bool {
        if !mode.memfd {
            return false;
        }
        let Some(spec) = self.get(slot) else {
            return false;
        };
        if matches!(spec, StreamSpec::Pipe) && (slot.is_input() || mode.max_buffer.is_some()) {
            return false;
        }
        spec.can_use_memory_backed_buffer(mode.is_sync)
    }

    /// Back every eligible slot with an anonymous memory file.
    ///
    /// Returns the slots now backed by memory files. Slots that fail to convert are left as they
    /// were.
    pub fn use_memory_backed_buffers(&mut self, mode: SpawnMode) -> Vec<Slot> {
        let eligible: Vec<Slot> = self
            .iter()
            .map(|(slot, _)| slot)
            .filter(|slot| self.can_use_memory_backed_buffer(*slot, mode))
            .collect();

        let mut converted = Vec::with_capacity(eligible.len());
        for slot in eligible {
            if let Some(spec) = self.get_mut(slot) {
                if spec.use_memory_backed_buffer(slot) {
                    converted.push(slot);
                }
            }
        }
        if !converted.is_empty() {
            debug!("Backed {} slot(s) with memory files", converted.len());
        }
        converted
    }

    /// Project every slot into the options a process launcher consumes, in slot order.
    pub fn project(self) -> Vec<SpawnStdio> {
        let Self { specs, overlapped } = self;
        specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let slot = Slot::new(index);
                let options = ProjectOptions {
                    overlapped: overlapped.contains(&slot),
                };
                spec.project(slot, options)
            })
            .collect()
    }
}

impl From<StdioSet> for Vec<StreamSpec> {
    fn from(set: StdioSet) -> Self {
        set.specs
    }
}
