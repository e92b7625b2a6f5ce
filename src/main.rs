use hypo::console::TerminalConsole;
use hypo::runtime::System;

fn main() {
    let mut system = System::new(TerminalConsole::new());
    let status = system.run();
    std::process::exit(status as i32);
}
