// Process control block layout and lifecycle. A PCB is not a native
// Rust struct: it is a 25-word block living in the OS heap, exactly
// where the free-list allocator put it. `PcbView` only ever carries
// the block's base address and reads/writes through `Memory` — there
// is no owned copy of PCB state anywhere else.

use crate::memory::{Memory, Word};
use crate::processor::Psr;

pub const PCB_SIZE: Word = 25;

const OFF_NEXT: Word = 0;
const OFF_PID: Word = 1;
const OFF_STATE: Word = 2;
const OFF_WAIT_REASON: Word = 3;
const OFF_PRIORITY: Word = 4;
const OFF_STACK_BASE: Word = 5;
const OFF_STACK_SIZE: Word = 6;
const OFF_SAVED_GPR: Word = 11;
const OFF_SAVED_SP: Word = 19;
const OFF_SAVED_PC: Word = 20;
const OFF_SAVED_PSR: Word = 21;

pub const END_OF_LIST: Word = -1;
pub const DEFAULT_PRIORITY: Word = 128;
pub const MIN_PRIORITY: Word = 0;
pub const MAX_PRIORITY: Word = 255;
pub const DEFAULT_STACK_SIZE: Word = 9;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Waiting,
}

impl ProcessState {
    fn to_word(self) -> Word {
        match self {
            Self::Ready => 1,
            Self::Waiting => 2,
        }
    }

    fn from_word(raw: Word) -> Self {
        if raw == 2 {
            Self::Waiting
        } else {
            Self::Ready
        }
    }
}

/// A view over one PCB's 25-word block at `base`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PcbView {
    pub base: Word,
}

impl PcbView {
    pub fn at(base: Word) -> Self {
        PcbView { base }
    }

    pub fn next(&self, memory: &Memory) -> Word {
        memory.read(self.base + OFF_NEXT)
    }

    pub fn set_next(&self, memory: &mut Memory, next: Word) {
        memory.write(self.base + OFF_NEXT, next);
    }

    pub fn pid(&self, memory: &Memory) -> Word {
        memory.read(self.base + OFF_PID)
    }

    pub fn state(&self, memory: &Memory) -> ProcessState {
        ProcessState::from_word(memory.read(self.base + OFF_STATE))
    }

    pub fn set_state(&self, memory: &mut Memory, state: ProcessState) {
        memory.write(self.base + OFF_STATE, state.to_word());
    }

    pub fn wait_reason(&self, memory: &Memory) -> Word {
        memory.read(self.base + OFF_WAIT_REASON)
    }

    pub fn set_wait_reason(&self, memory: &mut Memory, reason: Word) {
        memory.write(self.base + OFF_WAIT_REASON, reason);
    }

    pub fn priority(&self, memory: &Memory) -> Word {
        memory.read(self.base + OFF_PRIORITY)
    }

    pub fn set_priority(&self, memory: &mut Memory, priority: Word) {
        memory.write(self.base + OFF_PRIORITY, priority);
    }

    pub fn stack_base(&self, memory: &Memory) -> Word {
        memory.read(self.base + OFF_STACK_BASE)
    }

    pub fn set_stack_base(&self, memory: &mut Memory, base: Word) {
        memory.write(self.base + OFF_STACK_BASE, base);
    }

    pub fn stack_size(&self, memory: &Memory) -> Word {
        memory.read(self.base + OFF_STACK_SIZE)
    }

    pub fn set_stack_size(&self, memory: &mut Memory, size: Word) {
        memory.write(self.base + OFF_STACK_SIZE, size);
    }

    pub fn saved_gpr(&self, memory: &Memory, index: usize) -> Word {
        memory.read(self.base + OFF_SAVED_GPR + index as Word)
    }

    pub fn set_saved_gpr(&self, memory: &mut Memory, index: usize, value: Word) {
        memory.write(self.base + OFF_SAVED_GPR + index as Word, value);
    }

    pub fn saved_sp(&self, memory: &Memory) -> Word {
        memory.read(self.base + OFF_SAVED_SP)
    }

    pub fn set_saved_sp(&self, memory: &mut Memory, sp: Word) {
        memory.write(self.base + OFF_SAVED_SP, sp);
    }

    pub fn saved_pc(&self, memory: &Memory) -> Word {
        memory.read(self.base + OFF_SAVED_PC)
    }

    pub fn set_saved_pc(&self, memory: &mut Memory, pc: Word) {
        memory.write(self.base + OFF_SAVED_PC, pc);
    }

    pub fn saved_psr(&self, memory: &Memory) -> Psr {
        if memory.read(self.base + OFF_SAVED_PSR) == 1 {
            Psr::Os
        } else {
            Psr::User
        }
    }

    pub fn set_saved_psr(&self, memory: &mut Memory, psr: Psr) {
        let raw = match psr {
            Psr::Os => 1,
            Psr::User => 2,
        };
        memory.write(self.base + OFF_SAVED_PSR, raw);
    }

    /// Zero the block, set `next` to the end-of-list sentinel, stamp
    /// `pid`, and default to Ready at the default priority. Callers
    /// may override priority afterwards.
    pub fn initialize(&self, memory: &mut Memory, pid: Word) {
        for offset in 0..PCB_SIZE {
            memory.write(self.base + offset, 0);
        }
        self.set_next(memory, END_OF_LIST);
        memory.write(self.base + OFF_PID, pid);
        self.set_state(memory, ProcessState::Ready);
        self.set_priority(memory, DEFAULT_PRIORITY);
    }
}
