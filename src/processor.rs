// The Machine proper: registers, the fetch/decode/execute cycle, and
// the quantum-based preemption discipline. Syscalls are dispatched
// back out to the Kernel, since opcode 12 is the one instruction
// whose action reaches outside the Machine.

use std::fmt;

use crate::error::{CpuOutcome, ErrorKind};
use crate::fields::{decode, resolve_operand, DecodedInstruction, Opcode};
use crate::kernel::Kernel;
use crate::memory::{in_program, Memory, Word};
use crate::pcb::PcbView;

/// Every CPU run starts with this many clock units of budget.
pub const INITIAL_QUANTUM: Word = 2_000;

#[derive(Clone)]
pub struct Machine {
    pub gpr: [Word; 8],
    pub pc: Word,
    pub sp: Word,
    pub mar: Word,
    pub mbr: Word,
    pub ir: Word,
    pub psr: Psr,
    pub clock: Word,
    quantum: Word,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Psr {
    Os,
    User,
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            gpr: [0; 8],
            pc: 0,
            sp: 0,
            mar: 0,
            mbr: 0,
            ir: 0,
            psr: Psr::Os,
            clock: 0,
            quantum: 0,
        }
    }

    /// Load a PCB's saved image into the register file and switch to
    /// user mode. There is exactly one Machine register set; this is
    /// the only way it changes owner.
    pub fn dispatch(&mut self, pcb: &PcbView, memory: &Memory) {
        for (i, gpr) in self.gpr.iter_mut().enumerate() {
            *gpr = pcb.saved_gpr(memory, i);
        }
        self.sp = pcb.saved_sp(memory);
        self.pc = pcb.saved_pc(memory);
        self.psr = Psr::User;
    }

    /// Save the register file back into a PCB.
    pub fn save_context(&self, pcb: &PcbView, memory: &mut Memory) {
        for (i, gpr) in self.gpr.iter().enumerate() {
            pcb.set_saved_gpr(memory, i, *gpr);
        }
        pcb.set_saved_sp(memory, self.sp);
        pcb.set_saved_pc(memory, self.pc);
        pcb.set_saved_psr(memory, self.psr);
    }

    fn charge(&mut self, cost: Word) {
        self.clock += cost;
        self.quantum -= cost;
    }

    fn fetch(&mut self, memory: &Memory) -> Result<Word, ErrorKind> {
        if !in_program(self.pc) {
            return Err(ErrorKind::InvalidPc);
        }
        self.mar = self.pc;
        self.pc += 1;
        self.mbr = memory.read(self.mar);
        self.ir = self.mbr;
        Ok(self.ir)
    }

    /// Run until halt, quantum exhaustion, a syscall yield, or an
    /// error. The caller (the Kernel's run loop) owns the decision of
    /// what to do with the outcome.
    pub fn run(&mut self, memory: &mut Memory, kernel: &mut Kernel) -> CpuOutcome {
        self.quantum = INITIAL_QUANTUM;
        loop {
            match self.step(memory, kernel) {
                Ok(Some(outcome)) => return outcome,
                Ok(None) => {
                    if self.quantum <= 0 {
                        return CpuOutcome::QuantumExpired;
                    }
                }
                Err(e) => return CpuOutcome::Error(e),
            }
        }
    }

    /// Execute exactly one instruction. Returns `Ok(Some(outcome))`
    /// when that instruction ends the run (HALT, a syscall yield),
    /// `Ok(None)` to keep going, or `Err` on any error code.
    fn step(&mut self, memory: &mut Memory, kernel: &mut Kernel) -> Result<Option<CpuOutcome>, ErrorKind> {
        let ir = self.fetch(memory)?;
        let decoded = decode(ir)?;

        match decoded.opcode {
            Opcode::Halt => {
                self.charge(Opcode::Halt.cost());
                Ok(Some(CpuOutcome::Halted))
            }
            Opcode::Add => self.arithmetic(memory, &decoded, |a, b| a + b),
            Opcode::Subtract => self.arithmetic(memory, &decoded, |a, b| a - b),
            Opcode::Multiply => self.arithmetic(memory, &decoded, |a, b| a * b),
            Opcode::Divide => {
                let op1 = resolve_operand(self, memory, decoded.op1_mode, decoded.op1_gpr)?;
                let op2 = resolve_operand(self, memory, decoded.op2_mode, decoded.op2_gpr)?;
                if op2.value == 0 {
                    return Err(ErrorKind::DivideByZero);
                }
                let result = op1.value / op2.value;
                op1.store(self, memory, result)?;
                self.charge(Opcode::Divide.cost());
                Ok(None)
            }
            Opcode::Move => {
                let op1 = resolve_operand(self, memory, decoded.op1_mode, decoded.op1_gpr)?;
                let op2 = resolve_operand(self, memory, decoded.op2_mode, decoded.op2_gpr)?;
                op1.store(self, memory, op2.value)?;
                self.charge(Opcode::Move.cost());
                Ok(None)
            }
            Opcode::Branch => {
                self.branch_to_target(memory)?;
                self.charge(Opcode::Branch.cost());
                Ok(None)
            }
            Opcode::BranchOnMinus => self.branch_if(memory, &decoded, |v| v < 0, Opcode::BranchOnMinus.cost()),
            Opcode::BranchOnPlus => self.branch_if(memory, &decoded, |v| v > 0, Opcode::BranchOnPlus.cost()),
            Opcode::BranchOnZero => self.branch_if(memory, &decoded, |v| v == 0, Opcode::BranchOnZero.cost()),
            Opcode::Push => {
                let op1 = resolve_operand(self, memory, decoded.op1_mode, decoded.op1_gpr)?;
                let (base, size) = kernel.current_stack_bounds(memory);
                if self.sp == base + size {
                    return Err(ErrorKind::StackOverflow);
                }
                self.sp += 1;
                memory.write_user_heap(self.sp, op1.value)?;
                self.charge(Opcode::Push.cost());
                Ok(None)
            }
            Opcode::Pop => {
                let (base, _) = kernel.current_stack_bounds(memory);
                if self.sp < base {
                    return Err(ErrorKind::StackUnderflow);
                }
                let value = memory.read_user_heap(self.sp)?;
                let op1 = resolve_operand(self, memory, decoded.op1_mode, decoded.op1_gpr)?;
                op1.store(self, memory, value)?;
                self.sp -= 1;
                self.charge(Opcode::Pop.cost());
                Ok(None)
            }
            Opcode::Syscall => {
                let op1 = resolve_operand(self, memory, decoded.op1_mode, decoded.op1_gpr)?;
                let prior_psr = self.psr;
                self.psr = Psr::Os;
                let result = kernel.syscall(self, memory, op1.value);
                self.psr = prior_psr;
                self.charge(Opcode::Syscall.cost());
                result
            }
        }
    }

    fn arithmetic(
        &mut self,
        memory: &mut Memory,
        decoded: &DecodedInstruction,
        op: impl Fn(Word, Word) -> Word,
    ) -> Result<Option<CpuOutcome>, ErrorKind> {
        let op1 = resolve_operand(self, memory, decoded.op1_mode, decoded.op1_gpr)?;
        let op2 = resolve_operand(self, memory, decoded.op2_mode, decoded.op2_gpr)?;
        let result = op(op1.value, op2.value);
        op1.store(self, memory, result)?;
        self.charge(decoded.opcode.cost());
        Ok(None)
    }

    fn branch_to_target(&mut self, memory: &Memory) -> Result<(), ErrorKind> {
        let target = memory.read_program(self.pc)?;
        if !in_program(target) {
            return Err(ErrorKind::InvalidPc);
        }
        self.pc = target;
        Ok(())
    }

    /// Shared body for the three conditional branches: all three read
    /// the branch target from `memory[pc]`, exactly like unconditional
    /// BRANCH, and only advance past it when the test fails.
    fn branch_if(
        &mut self,
        memory: &mut Memory,
        decoded: &DecodedInstruction,
        test: impl Fn(Word) -> bool,
        cost: Word,
    ) -> Result<Option<CpuOutcome>, ErrorKind> {
        let op1 = resolve_operand(self, memory, decoded.op1_mode, decoded.op1_gpr)?;
        if test(op1.value) {
            self.branch_to_target(memory)?;
        } else {
            if !in_program(self.pc) {
                return Err(ErrorKind::InvalidPc);
            }
            self.pc += 1;
        }
        self.charge(cost);
        Ok(None)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- machine state ---")?;
        for (i, g) in self.gpr.iter().enumerate() {
            write!(f, "G{i}={g:<8}")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "SP={:<8} PC={:<8} PSR={:?} CLOCK={}",
            self.sp, self.pc, self.psr, self.clock
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;

    fn machine_with_program(words: &[(Word, Word)], entry: Word) -> (Machine, Memory) {
        let mut memory = Memory::new();
        for (addr, value) in words {
            memory.write_program(*addr, *value).unwrap();
        }
        let mut m = Machine::new();
        m.pc = entry;
        m.psr = Psr::User;
        (m, memory)
    }

    #[test]
    fn halt_reports_halted_and_charges_twelve() {
        let (mut m, mut mem) = machine_with_program(&[(0, 0)], 0);
        let mut kernel = Kernel::new();
        let outcome = m.run(&mut mem, &mut kernel);
        assert_eq!(outcome, CpuOutcome::Halted);
        assert_eq!(m.clock, 12);
    }

    #[test]
    fn divide_by_zero_is_reported_as_an_error() {
        // MOVE immediate 0 into gpr2 (op1 mode=1 reg=2, op2 mode=6)
        let mov = 5 * 10_000 + 1 * 1_000 + 2 * 100 + 6 * 10;
        // DIVIDE gpr1 by gpr2 (op1 mode=1 reg=1, op2 mode=1 reg=2)
        let div = 4 * 10_000 + 1 * 1_000 + 1 * 100 + 1 * 10 + 2;
        let (mut m, mut mem) = machine_with_program(&[(0, mov), (1, 0), (2, div)], 0);
        let mut kernel = Kernel::new();
        let outcome = m.run(&mut mem, &mut kernel);
        assert_eq!(outcome, CpuOutcome::Error(ErrorKind::DivideByZero));
    }

    #[test]
    fn tight_branch_to_self_expires_the_quantum() {
        // BRANCH to address 0 (modes/regs irrelevant, all zero).
        let branch = 6 * 10_000;
        let (mut m, mut mem) = machine_with_program(&[(0, branch), (1, 0)], 0);
        let mut kernel = Kernel::new();
        let outcome = m.run(&mut mem, &mut kernel);
        assert_eq!(outcome, CpuOutcome::QuantumExpired);
        // 2000 / 2 = 1000 branches exactly exhaust the quantum.
        assert_eq!(m.clock, 2000);
        assert_eq!(m.pc, 0);
    }
}
