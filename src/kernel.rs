// The Kernel: both free lists, both scheduling queues, process
// lifecycle, and syscall dispatch. The Machine calls back into here
// for anything that reaches past the register file — syscalls, and
// the stack-bounds check PUSH/POP need to know which process is
// currently dispatched.

use crate::allocator::FreeList;
use crate::error::{CpuOutcome, ErrorKind};
use crate::loader::LoadedModule;
use crate::memory::{Memory, Word, OS_HEAP_HI, OS_HEAP_LO, USER_HEAP_HI, USER_HEAP_LO};
use crate::pcb::{PcbView, DEFAULT_STACK_SIZE, MAX_PRIORITY, MIN_PRIORITY, PCB_SIZE};
use crate::processor::Machine;
use crate::queue::{ReadyQueue, WaitingQueue};

pub const WAIT_REASON_GETC: Word = 8;
pub const WAIT_REASON_PUTC: Word = 9;

pub const SYSCALL_PROCESS_CREATE: Word = 1;
pub const SYSCALL_PROCESS_DELETE: Word = 2;
pub const SYSCALL_PROCESS_INQUIRY: Word = 3;
pub const SYSCALL_MEM_ALLOC: Word = 4;
pub const SYSCALL_MEM_FREE: Word = 5;
pub const SYSCALL_MSG_SEND: Word = 6;
pub const SYSCALL_MSG_RECV: Word = 7;
pub const SYSCALL_IO_GETC: Word = 8;
pub const SYSCALL_IO_PUTC: Word = 9;
pub const SYSCALL_TIME_GET: Word = 10;
pub const SYSCALL_TIME_SET: Word = 11;

pub struct Kernel {
    pub ready: ReadyQueue,
    pub waiting: WaitingQueue,
    os_free: FreeList,
    user_free: FreeList,
    next_pid: Word,
    /// The PCB currently dispatched into the Machine, if any.
    pub running: Option<PcbView>,
    pub shutdown: bool,
}

impl Kernel {
    pub fn new() -> Self {
        let mut memory = Memory::new();
        Self::with_memory(&mut memory)
    }

    /// Construct a Kernel whose free lists are threaded through
    /// `memory`'s OS/user heap regions. Callers that already own a
    /// `Memory` should prefer this over `new()`, which allocates a
    /// throwaway `Memory` purely to seed the free-list headers before
    /// the real one exists; `System::new` (runtime.rs) always uses
    /// this path.
    pub fn with_memory(memory: &mut Memory) -> Self {
        Kernel {
            ready: ReadyQueue::new(),
            waiting: WaitingQueue::new(),
            os_free: FreeList::new(memory, OS_HEAP_LO as Word, OS_HEAP_HI as Word),
            user_free: FreeList::new(memory, USER_HEAP_LO as Word, USER_HEAP_HI as Word),
            next_pid: 1,
            running: None,
            shutdown: false,
        }
    }

    fn allocate_pid(&mut self) -> Word {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    /// The stack bounds of the currently-dispatched process, queried
    /// by PUSH/POP for their overflow/underflow checks. Panics if no
    /// process is dispatched, since PUSH/POP can only execute while a
    /// process is running.
    pub fn current_stack_bounds(&self, memory: &Memory) -> (Word, Word) {
        let pcb = self.running.expect("stack operation with no process dispatched");
        (pcb.stack_base(memory), pcb.stack_size(memory))
    }

    /// Build a new process: validate its priority, allocate its PCB,
    /// load its module, allocate its stack, and insert it into Ready.
    /// Any failure along the way unwinds the partial allocations it
    /// already made before propagating the error.
    pub fn create_process(&mut self, memory: &mut Memory, module: &LoadedModule, priority: Word) -> Result<Word, ErrorKind> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(ErrorKind::InvalidSize);
        }

        let pcb_base = self.os_free.allocate(memory, PCB_SIZE)?;
        let pcb = PcbView::at(pcb_base);
        let pid = self.allocate_pid();
        pcb.initialize(memory, pid);
        pcb.set_priority(memory, priority);

        if let Err(e) = module.install(memory) {
            self.os_free.free(memory, pcb_base, PCB_SIZE).ok();
            return Err(e);
        }
        pcb.set_saved_pc(memory, module.entry_point);

        let stack_base = match self.user_free.allocate(memory, DEFAULT_STACK_SIZE) {
            Ok(base) => base,
            Err(e) => {
                self.os_free.free(memory, pcb_base, PCB_SIZE).ok();
                return Err(e);
            }
        };
        pcb.set_stack_base(memory, stack_base);
        pcb.set_stack_size(memory, DEFAULT_STACK_SIZE);
        pcb.set_saved_sp(memory, stack_base - 1);

        self.ready.insert(memory, pcb);
        Ok(pid)
    }

    /// Free a process's stack and PCB back to their respective free
    /// lists.
    pub fn terminate_process(&mut self, memory: &mut Memory, pcb: PcbView) -> Result<(), ErrorKind> {
        let stack_base = pcb.stack_base(memory);
        let stack_size = pcb.stack_size(memory);
        self.user_free.free(memory, stack_base, stack_size)?;
        self.os_free.free(memory, pcb.base, PCB_SIZE)?;
        Ok(())
    }

    /// Terminate every PCB on both queues, as shutdown requires.
    pub fn terminate_all(&mut self, memory: &mut Memory) {
        while let Some(pcb) = self.ready.select(memory) {
            self.terminate_process(memory, pcb).ok();
        }
        loop {
            let Some(pcb) = self.waiting.remove_first_matching(memory, WAIT_REASON_GETC)
                .or_else(|| self.waiting.remove_first_matching(memory, WAIT_REASON_PUTC))
            else {
                break;
            };
            self.terminate_process(memory, pcb).ok();
        }
    }

    /// Dispatch one syscall. Returns `Ok(Some(_))` when the syscall
    /// ends the current run (the two I/O yields), `Ok(None)` for
    /// syscalls that merely record a status and let execution
    /// continue, or `Err` for an unknown service id.
    pub fn syscall(&mut self, machine: &mut Machine, memory: &mut Memory, service_id: Word) -> Result<Option<CpuOutcome>, ErrorKind> {
        match service_id {
            SYSCALL_MEM_ALLOC => {
                let size = machine.gpr[2];
                match self.user_free.allocate(memory, size) {
                    Ok(ptr) => {
                        machine.gpr[1] = ptr;
                        machine.gpr[0] = 0;
                    }
                    Err(e) => machine.gpr[0] = e.code(),
                }
                Ok(None)
            }
            SYSCALL_MEM_FREE => {
                let ptr = machine.gpr[1];
                let size = machine.gpr[2];
                match self.user_free.free(memory, ptr, size) {
                    Ok(()) => machine.gpr[0] = 0,
                    Err(e) => machine.gpr[0] = e.code(),
                }
                Ok(None)
            }
            SYSCALL_IO_GETC => Ok(Some(CpuOutcome::YieldedGetc)),
            SYSCALL_IO_PUTC => Ok(Some(CpuOutcome::YieldedPutc)),
            SYSCALL_PROCESS_CREATE
            | SYSCALL_PROCESS_DELETE
            | SYSCALL_PROCESS_INQUIRY
            | SYSCALL_MSG_SEND
            | SYSCALL_MSG_RECV
            | SYSCALL_TIME_GET
            | SYSCALL_TIME_SET => {
                machine.gpr[0] = 0;
                Ok(None)
            }
            _ => Err(ErrorKind::InvalidSyscall),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
