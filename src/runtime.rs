// The top-level run loop: ties Memory, Machine, Kernel, and the
// operator Console together. A thin owning struct whose `run` method
// drives the interrupt/dispatch cycle until told to stop.

use crate::console::{Console, Interrupt};
use crate::error::CpuOutcome;
use crate::kernel::{Kernel, WAIT_REASON_GETC, WAIT_REASON_PUTC};
use crate::loader::LoadedModule;
use crate::memory::Memory;
use crate::pcb::DEFAULT_PRIORITY;
use crate::processor::Machine;

pub struct System<C: Console> {
    pub memory: Memory,
    pub machine: Machine,
    pub kernel: Kernel,
    pub console: C,
}

impl<C: Console> System<C> {
    pub fn new(console: C) -> Self {
        let mut memory = Memory::new();
        let kernel = Kernel::with_memory(&mut memory);
        System { memory, machine: Machine::new(), kernel, console }
    }

    /// Run until the shutdown interrupt is processed. Returns the exit
    /// status: 0 on orderly shutdown.
    pub fn run(&mut self) -> i64 {
        loop {
            self.handle_interrupt();
            if self.kernel.shutdown {
                return 0;
            }
            self.run_one_cycle();
        }
    }

    pub fn handle_interrupt(&mut self) {
        match self.console.read_interrupt() {
            Interrupt::NoOp => {}
            Interrupt::RunProgram => self.handle_run_program(),
            Interrupt::Shutdown => {
                self.kernel.terminate_all(&mut self.memory);
                self.kernel.shutdown = true;
            }
            Interrupt::InputComplete => self.handle_input_complete(),
            Interrupt::OutputComplete => self.handle_output_complete(),
        }
    }

    fn handle_run_program(&mut self) {
        let name = self.console.read_module_name();
        let module = match LoadedModule::load_file(std::path::Path::new(&name)) {
            Ok(m) => m,
            Err(e) => {
                self.console.report_error(&e.to_string());
                return;
            }
        };
        if let Err(e) = self.kernel.create_process(&mut self.memory, &module, DEFAULT_PRIORITY) {
            self.console.report_error(&e.to_string());
        }
    }

    fn handle_input_complete(&mut self) {
        let pid = self.console.read_pid();
        let Ok(pcb) = self.kernel.waiting.remove(&mut self.memory, pid) else {
            self.console.report_error("no such pid");
            return;
        };
        let c = self.console.read_char();
        pcb.set_saved_gpr(&mut self.memory, 1, c as i64);
        self.kernel.ready.insert(&mut self.memory, pcb);
    }

    fn handle_output_complete(&mut self) {
        let pid = self.console.read_pid();
        let Ok(pcb) = self.kernel.waiting.remove(&mut self.memory, pid) else {
            self.console.report_error("no such pid");
            return;
        };
        let c = pcb.saved_gpr(&self.memory, 1);
        self.console.write_char(char::from_u32(c as u32).unwrap_or('\0'));
        self.kernel.ready.insert(&mut self.memory, pcb);
    }

    /// Select the next process, run it for one quantum, and route it
    /// to Ready, Waiting, or termination based on the outcome.
    pub fn run_one_cycle(&mut self) {
        let Some(pcb) = self.kernel.ready.select(&self.memory) else {
            return;
        };
        self.kernel.running = Some(pcb);
        self.machine.dispatch(&pcb, &self.memory);

        let outcome = self.machine.run(&mut self.memory, &mut self.kernel);
        self.machine.save_context(&pcb, &mut self.memory);
        self.kernel.running = None;

        match outcome {
            CpuOutcome::Halted => {
                self.kernel.terminate_process(&mut self.memory, pcb).ok();
            }
            CpuOutcome::QuantumExpired => {
                self.kernel.ready.insert(&mut self.memory, pcb);
            }
            CpuOutcome::YieldedGetc => {
                self.kernel.waiting.insert(&mut self.memory, pcb, WAIT_REASON_GETC);
            }
            CpuOutcome::YieldedPutc => {
                self.kernel.waiting.insert(&mut self.memory, pcb, WAIT_REASON_PUTC);
            }
            CpuOutcome::Error(e) => {
                self.console.report_error(&e.to_string());
                self.kernel.terminate_process(&mut self.memory, pcb).ok();
            }
        }
    }
}
