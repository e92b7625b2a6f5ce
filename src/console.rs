// The operator console: the run loop's only interaction with the
// outside world. A narrow trait implemented once for the real
// terminal and once for a scripted double, so the run loop and its
// tests share one code path.

use std::io::{self, Write};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interrupt {
    NoOp,
    RunProgram,
    Shutdown,
    InputComplete,
    OutputComplete,
}

impl Interrupt {
    fn from_word(raw: i64) -> Self {
        match raw {
            1 => Self::RunProgram,
            2 => Self::Shutdown,
            3 => Self::InputComplete,
            4 => Self::OutputComplete,
            _ => Self::NoOp,
        }
    }
}

/// Everything the run loop needs from an operator, abstracted so
/// tests can script a scenario instead of driving real stdin/stdout.
pub trait Console {
    fn read_interrupt(&mut self) -> Interrupt;
    fn read_module_name(&mut self) -> String;
    fn read_pid(&mut self) -> i64;
    fn read_char(&mut self) -> char;
    fn write_char(&mut self, c: char);
    fn report_error(&mut self, message: &str);
}

/// The real console: prints the interrupt menu and reads from stdin.
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        TerminalConsole
    }

    fn read_line(&self) -> String {
        let mut line = String::new();
        io::stdin().read_line(&mut line).ok();
        line.trim().to_string()
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn read_interrupt(&mut self) -> Interrupt {
        println!("0 no-op  1 run-program  2 shutdown  3 input-complete  4 output-complete");
        print!("interrupt> ");
        io::stdout().flush().ok();
        let raw: i64 = self.read_line().parse().unwrap_or(0);
        Interrupt::from_word(raw)
    }

    fn read_module_name(&mut self) -> String {
        print!("module file> ");
        io::stdout().flush().ok();
        self.read_line()
    }

    fn read_pid(&mut self) -> i64 {
        print!("pid> ");
        io::stdout().flush().ok();
        self.read_line().parse().unwrap_or(-1)
    }

    fn read_char(&mut self) -> char {
        print!("char> ");
        io::stdout().flush().ok();
        self.read_line().chars().next().unwrap_or('\0')
    }

    fn write_char(&mut self, c: char) {
        print!("{c}");
        io::stdout().flush().ok();
    }

    fn report_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// A scripted console for tests: a fixed sequence of interrupts plus
/// side-channel module names, PIDs, and characters to hand back as
/// they're asked for. Output is recorded instead of printed.
#[derive(Default)]
pub struct ScriptedConsole {
    interrupts: std::collections::VecDeque<Interrupt>,
    module_names: std::collections::VecDeque<String>,
    pids: std::collections::VecDeque<i64>,
    input_chars: std::collections::VecDeque<char>,
    pub output: Vec<char>,
    pub errors: Vec<String>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_interrupt(&mut self, interrupt: Interrupt) -> &mut Self {
        self.interrupts.push_back(interrupt);
        self
    }

    pub fn push_module_name(&mut self, name: &str) -> &mut Self {
        self.module_names.push_back(name.to_string());
        self
    }

    pub fn push_pid(&mut self, pid: i64) -> &mut Self {
        self.pids.push_back(pid);
        self
    }

    pub fn push_input_char(&mut self, c: char) -> &mut Self {
        self.input_chars.push_back(c);
        self
    }
}

impl Console for ScriptedConsole {
    fn read_interrupt(&mut self) -> Interrupt {
        self.interrupts.pop_front().unwrap_or(Interrupt::Shutdown)
    }

    fn read_module_name(&mut self) -> String {
        self.module_names.pop_front().unwrap_or_default()
    }

    fn read_pid(&mut self) -> i64 {
        self.pids.pop_front().unwrap_or(-1)
    }

    fn read_char(&mut self) -> char {
        self.input_chars.pop_front().unwrap_or('\0')
    }

    fn write_char(&mut self, c: char) {
        self.output.push(c);
    }

    fn report_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
