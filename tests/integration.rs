// End-to-end scenarios straight out of the testable-properties seed
// cases: a full program running through System::run_one_cycle against
// a scripted Console, rather than unit-level Machine/Kernel calls.

use hypo::console::{Interrupt, ScriptedConsole};
use hypo::error::{CpuOutcome, ErrorKind};
use hypo::kernel::WAIT_REASON_GETC;
use hypo::loader::LoadedModule;
use hypo::pcb::DEFAULT_PRIORITY;
use hypo::runtime::System;

fn system_with_module(text: &str, priority: i64) -> (System<ScriptedConsole>, i64) {
    let module = LoadedModule::parse(text).unwrap();
    let mut system = System::new(ScriptedConsole::new());
    let pid = system.kernel.create_process(&mut system.memory, &module, priority).unwrap();
    (system, pid)
}

#[test]
fn s1_sum_of_ten_halts_with_fifty_five_in_gpr1() {
    let text = "0 51060 1 10 2 51160 3 0 4 11110 5 21060 6 1 7 81000 8 4 9 0 -1 0";
    let (mut system, _pid) = system_with_module(text, DEFAULT_PRIORITY);
    system.run_one_cycle();
    assert!(system.kernel.ready.is_empty());
    assert!(system.kernel.waiting.is_empty());
}

#[test]
fn s1_sum_of_ten_matches_the_machine_directly() {
    use hypo::memory::Memory;
    use hypo::processor::Machine;
    use hypo::kernel::Kernel;

    let text = "0 51060 1 10 2 51160 3 0 4 11110 5 21060 6 1 7 81000 8 4 9 0 -1 0";
    let module = LoadedModule::parse(text).unwrap();
    let mut memory = Memory::new();
    module.install(&mut memory).unwrap();
    let mut machine = Machine::new();
    machine.pc = module.entry_point;
    let mut kernel = Kernel::with_memory(&mut memory);
    let outcome = machine.run(&mut memory, &mut kernel);
    assert_eq!(outcome, CpuOutcome::Halted);
    assert_eq!(machine.gpr[1], 55);
}

#[test]
fn s2_divide_by_zero_frees_both_the_stack_and_the_pcb() {
    let text = "0 51260 1 0 2 41112 -1 0";
    let (mut system, _pid) = system_with_module(text, DEFAULT_PRIORITY);
    system.run_one_cycle();
    assert!(system.kernel.ready.is_empty());
    assert!(system.kernel.waiting.is_empty());

    // The freed PCB and stack blocks must be available to a fresh process.
    let again = LoadedModule::parse("0 0 -1 0").unwrap();
    system.kernel.create_process(&mut system.memory, &again, DEFAULT_PRIORITY).unwrap();
}

#[test]
fn s3_pop_with_an_empty_stack_is_a_stack_underflow() {
    use hypo::kernel::Kernel;
    use hypo::memory::Memory;
    use hypo::processor::Machine;

    let text = "0 111000 -1 0";
    let module = LoadedModule::parse(text).unwrap();
    let mut memory = Memory::new();
    let mut kernel = Kernel::with_memory(&mut memory);
    let pid = kernel.create_process(&mut memory, &module, DEFAULT_PRIORITY).unwrap();
    let pcb = kernel.ready.select(&memory).unwrap();
    assert_eq!(pcb.pid(&memory), pid);

    let mut machine = Machine::new();
    machine.dispatch(&pcb, &memory);
    kernel.running = Some(pcb);
    let outcome = machine.run(&mut memory, &mut kernel);
    assert_eq!(outcome, CpuOutcome::Error(ErrorKind::StackUnderflow));
}

#[test]
fn s5_priority_ordering_dispatches_two_hundreds_before_ten() {
    let module = LoadedModule::parse("0 0 -1 0").unwrap();
    let mut system = System::new(ScriptedConsole::new());
    let low = system.kernel.create_process(&mut system.memory, &module, 10).unwrap();
    let high_a = system.kernel.create_process(&mut system.memory, &module, 200).unwrap();
    let high_b = system.kernel.create_process(&mut system.memory, &module, 200).unwrap();

    let first = system.kernel.ready.select(&system.memory).unwrap();
    let second = system.kernel.ready.select(&system.memory).unwrap();
    let third = system.kernel.ready.select(&system.memory).unwrap();

    assert_eq!(first.pid(&system.memory), high_a);
    assert_eq!(second.pid(&system.memory), high_b);
    assert_eq!(third.pid(&system.memory), low);
}

#[test]
fn s6_io_getc_round_trip_delivers_the_character_on_redispatch() {
    // SYSCALL with immediate service id 8 (io-getc), then HALT.
    let text = "0 126000 1 8 2 0 -1 0";
    let (mut system, pid) = system_with_module(text, DEFAULT_PRIORITY);

    system.run_one_cycle();
    assert!(system.kernel.ready.is_empty());
    assert!(!system.kernel.waiting.is_empty());

    system.console.push_interrupt(Interrupt::InputComplete);
    system.console.push_pid(pid);
    system.console.push_input_char('q');
    system.handle_interrupt();

    let pcb = system.kernel.ready.select(&system.memory).unwrap();
    assert_eq!(pcb.saved_gpr(&system.memory, 1), 'q' as i64);

    system.kernel.ready.insert(&mut system.memory, pcb);
    system.run_one_cycle();
    assert!(system.kernel.ready.is_empty());
}

#[test]
fn waiting_queue_reason_is_getc_while_parked() {
    let text = "0 126000 1 8 2 0 -1 0";
    let (mut system, pid) = system_with_module(text, DEFAULT_PRIORITY);
    system.run_one_cycle();
    let pcb = system.kernel.waiting.remove(&mut system.memory, pid).unwrap();
    assert_eq!(pcb.wait_reason(&system.memory), WAIT_REASON_GETC);
}
