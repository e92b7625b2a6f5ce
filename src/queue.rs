// Ready and waiting queues, both threaded through the PCB's own
// `next` field rather than a separate Rust collection — consistent
// with the pointer-via-index discipline the allocator and PCB modules
// already follow.

use crate::error::ErrorKind;
use crate::memory::{Memory, Word};
use crate::pcb::{ProcessState, PcbView, END_OF_LIST};

/// Priority-sorted ready queue: strictly non-increasing priority head
/// to tail, insertion order preserved among equal priorities.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    head: Word,
}

impl ReadyQueue {
    pub fn new() -> Self {
        ReadyQueue { head: END_OF_LIST }
    }

    pub fn is_empty(&self) -> bool {
        self.head == END_OF_LIST
    }

    pub fn insert(&mut self, memory: &mut Memory, pcb: PcbView) {
        pcb.set_state(memory, ProcessState::Ready);
        let priority = pcb.priority(memory);

        if self.head == END_OF_LIST || PcbView::at(self.head).priority(memory) < priority {
            pcb.set_next(memory, self.head);
            self.head = pcb.base;
            return;
        }

        let mut cursor = PcbView::at(self.head);
        loop {
            let next = cursor.next(memory);
            if next == END_OF_LIST || PcbView::at(next).priority(memory) < priority {
                pcb.set_next(memory, next);
                cursor.set_next(memory, pcb.base);
                return;
            }
            cursor = PcbView::at(next);
        }
    }

    pub fn select(&mut self, memory: &Memory) -> Option<PcbView> {
        if self.head == END_OF_LIST {
            return None;
        }
        let selected = PcbView::at(self.head);
        self.head = selected.next(memory);
        Some(selected)
    }
}

/// LIFO waiting queue, keyed by wait-reason. All waiters share one
/// list; `wait_reason` on each PCB distinguishes what each one is
/// blocked on (io-getc, io-putc, ...).
#[derive(Debug, Default)]
pub struct WaitingQueue {
    head: Word,
}

impl WaitingQueue {
    pub fn new() -> Self {
        WaitingQueue { head: END_OF_LIST }
    }

    pub fn is_empty(&self) -> bool {
        self.head == END_OF_LIST
    }

    pub fn insert(&mut self, memory: &mut Memory, pcb: PcbView, wait_reason: Word) {
        pcb.set_state(memory, ProcessState::Waiting);
        pcb.set_wait_reason(memory, wait_reason);
        pcb.set_next(memory, self.head);
        self.head = pcb.base;
    }

    /// Linear scan for `pid`, unlinking and returning it on a hit.
    pub fn remove(&mut self, memory: &mut Memory, pid: Word) -> Result<PcbView, ErrorKind> {
        let mut prev: Option<Word> = None;
        let mut cursor = self.head;
        while cursor != END_OF_LIST {
            let view = PcbView::at(cursor);
            let next = view.next(memory);
            if view.pid(memory) == pid {
                match prev {
                    Some(p) => PcbView::at(p).set_next(memory, next),
                    None => self.head = next,
                }
                view.set_next(memory, END_OF_LIST);
                return Ok(view);
            }
            prev = Some(cursor);
            cursor = next;
        }
        Err(ErrorKind::InvalidPid)
    }

    /// Remove and return the first waiter blocked on `wait_reason`,
    /// if any (used to wake one process per completed I/O interrupt).
    pub fn remove_first_matching(&mut self, memory: &mut Memory, wait_reason: Word) -> Option<PcbView> {
        let mut prev: Option<Word> = None;
        let mut cursor = self.head;
        while cursor != END_OF_LIST {
            let view = PcbView::at(cursor);
            let next = view.next(memory);
            if view.wait_reason(memory) == wait_reason {
                match prev {
                    Some(p) => PcbView::at(p).set_next(memory, next),
                    None => self.head = next,
                }
                view.set_next(memory, END_OF_LIST);
                return Some(view);
            }
            prev = Some(cursor);
            cursor = next;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::OS_HEAP_LO;

    fn pcb_at(memory: &mut Memory, offset: Word, pid: Word, priority: Word) -> PcbView {
        let pcb = PcbView::at(OS_HEAP_LO as Word + offset);
        pcb.initialize(memory, pid);
        pcb.set_priority(memory, priority);
        pcb
    }

    #[test]
    fn ready_queue_orders_by_priority_then_insertion() {
        let mut memory = Memory::new();
        let mut ready = ReadyQueue::new();
        let low = pcb_at(&mut memory, 0, 1, 10);
        let high_a = pcb_at(&mut memory, 25, 2, 200);
        let high_b = pcb_at(&mut memory, 50, 3, 200);

        ready.insert(&mut memory, low);
        ready.insert(&mut memory, high_a);
        ready.insert(&mut memory, high_b);

        assert_eq!(ready.select(&memory).unwrap().pid(&memory), 2);
        assert_eq!(ready.select(&memory).unwrap().pid(&memory), 3);
        assert_eq!(ready.select(&memory).unwrap().pid(&memory), 1);
        assert!(ready.select(&memory).is_none());
    }

    #[test]
    fn waiting_queue_remove_finds_by_pid() {
        let mut memory = Memory::new();
        let mut waiting = WaitingQueue::new();
        let a = pcb_at(&mut memory, 0, 11, 128);
        let b = pcb_at(&mut memory, 25, 12, 128);
        waiting.insert(&mut memory, a, 1);
        waiting.insert(&mut memory, b, 2);

        let found = waiting.remove(&mut memory, 11).unwrap();
        assert_eq!(found.pid(&memory), 11);
        assert_eq!(waiting.remove(&mut memory, 11), Err(ErrorKind::InvalidPid));
    }

    #[test]
    fn waiting_queue_remove_first_matching_wakes_one_waiter() {
        let mut memory = Memory::new();
        let mut waiting = WaitingQueue::new();
        let a = pcb_at(&mut memory, 0, 21, 128);
        let b = pcb_at(&mut memory, 25, 22, 128);
        waiting.insert(&mut memory, a, 9);
        waiting.insert(&mut memory, b, 9);

        let woken = waiting.remove_first_matching(&mut memory, 9).unwrap();
        assert_eq!(woken.pid(&memory), 22);
        let woken = waiting.remove_first_matching(&mut memory, 9).unwrap();
        assert_eq!(woken.pid(&memory), 21);
        assert!(waiting.remove_first_matching(&mut memory, 9).is_none());
    }
}
