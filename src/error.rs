// Error kinds and the discriminated CPU run result. A run either
// halts, runs out of quantum, yields for I/O, or fails with one of
// these error kinds — callers match on the variant rather than on a
// status code's sign.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    FsCantOpen,
    InvalidAddrInProgram,
    InvalidPc,
    NoEof,
    InvalidMode,
    InvalidGpr,
    InvalidOpcode,
    InvalidAddrInGpr,
    StackOverflow,
    StackUnderflow,
    DivideByZero,
    InvalidPid,
    InsufficientMem,
    NotMemBlock,
    InvalidSyscall,
    QueueFull,
    InvalidFsName,
    InvalidMemAddr,
    ReqMemTooSmall,
    InvalidMemRange,
    InvalidSize,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::FsCantOpen => "cannot open file",
            Self::InvalidAddrInProgram => "invalid address in program",
            Self::InvalidPc => "invalid address for program counter",
            Self::NoEof => "object module has no end-of-file marker",
            Self::InvalidMode => "invalid operand mode",
            Self::InvalidGpr => "invalid general purpose register",
            Self::InvalidOpcode => "invalid opcode",
            Self::InvalidAddrInGpr => "invalid address in general purpose register",
            Self::StackOverflow => "stack overflow",
            Self::StackUnderflow => "stack underflow",
            Self::DivideByZero => "cannot divide by zero",
            Self::InvalidPid => "invalid process id",
            Self::InsufficientMem => "insufficient memory",
            Self::NotMemBlock => "pointer does not head a memory block",
            Self::InvalidSyscall => "invalid syscall id",
            Self::QueueFull => "queue is full",
            Self::InvalidFsName => "invalid file name",
            Self::InvalidMemAddr => "invalid memory address",
            Self::ReqMemTooSmall => "requested memory block is too small",
            Self::InvalidMemRange => "memory range is invalid for this region",
            Self::InvalidSize => "invalid size",
        };
        write!(f, "{}", msg)
    }
}

impl ErrorKind {
    /// The negative status code this error reports into gpr\[0\] for
    /// syscalls that communicate failure that way. Zero is reserved
    /// for success, so every error kind maps to a distinct negative
    /// ordinal.
    pub fn code(&self) -> i64 {
        let ordinal = match self {
            Self::FsCantOpen => 1,
            Self::InvalidAddrInProgram => 2,
            Self::InvalidPc => 3,
            Self::NoEof => 4,
            Self::InvalidMode => 5,
            Self::InvalidGpr => 6,
            Self::InvalidOpcode => 7,
            Self::InvalidAddrInGpr => 8,
            Self::StackOverflow => 9,
            Self::StackUnderflow => 10,
            Self::DivideByZero => 11,
            Self::InvalidPid => 12,
            Self::InsufficientMem => 13,
            Self::NotMemBlock => 14,
            Self::InvalidSyscall => 15,
            Self::QueueFull => 16,
            Self::InvalidFsName => 17,
            Self::InvalidMemAddr => 18,
            Self::ReqMemTooSmall => 19,
            Self::InvalidMemRange => 20,
            Self::InvalidSize => 21,
        };
        -ordinal
    }
}

impl std::error::Error for ErrorKind {}

/// The discriminated result of one CPU run. Callers match on the
/// variant, never on a signed integer's sign.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CpuOutcome {
    Halted,
    QuantumExpired,
    YieldedGetc,
    YieldedPutc,
    Error(ErrorKind),
}

impl fmt::Display for CpuOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Halted => write!(f, "halted"),
            Self::QuantumExpired => write!(f, "quantum expired"),
            Self::YieldedGetc => write!(f, "yielded for getc"),
            Self::YieldedPutc => write!(f, "yielded for putc"),
            Self::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<ErrorKind> for CpuOutcome {
    fn from(e: ErrorKind) -> Self {
        CpuOutcome::Error(e)
    }
}
