//! Test doubles for the host traits.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::classify::{self, FrameClassifier};
use crate::error::{Error, Result};
use crate::host::{Debugger, PendingFrame, Unwinder};

/// A pending frame with a handful of registers and word-granular memory.
#[derive(Default)]
pub(crate) struct FakeFrame {
    pub(crate) registers: BTreeMap<&'static str, u64>,
    pub(crate) words: BTreeMap<u64, u64>,
    pub(crate) memory_reads: Cell<usize>,
}

impl FakeFrame {
    pub(crate) fn x86_64(fp: u64, sp: u64, pc: u64) -> Self {
        let mut frame = FakeFrame::default();
        frame.registers.extend([("rbp", fp), ("rsp", sp), ("rip", pc)]);
        frame
    }

    pub(crate) fn with_words(mut self, addr: u64, words: &[u64]) -> Self {
        for (i, word) in words.iter().enumerate() {
            self.words.insert(addr + 8 * i as u64, *word);
        }
        self
    }
}

impl PendingFrame for FakeFrame {
    fn read_register(&self, name: &str) -> Result<u64> {
        self.registers
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownRegister(name.into()))
    }

    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        self.memory_reads.set(self.memory_reads.get() + 1);
        let word = self.words.get(&addr).ok_or(Error::MemoryRead {
            addr,
            len: buf.len(),
        })?;
        buf.copy_from_slice(&word.to_le_bytes()[..buf.len()]);
        Ok(())
    }
}

/// A debugger that records registrations instead of installing anything.
#[derive(Default)]
pub(crate) struct FakeDebugger {
    pub(crate) arch: Option<&'static str>,
    pub(crate) registered: Vec<Box<dyn Unwinder>>,
    pub(crate) refuse_registration: bool,
}

impl Debugger for FakeDebugger {
    fn newest_frame_architecture(&self) -> Result<String> {
        self.arch.map(String::from).ok_or(Error::NoTarget)
    }

    fn register_unwinder(&mut self, unwinder: Box<dyn Unwinder>) -> Result<()> {
        if self.refuse_registration {
            return Err(Error::DuplicateUnwinder(unwinder.name().into()));
        }
        self.registered.push(unwinder);
        Ok(())
    }
}

/// Classifies by pc against a fixed list, counting queries and optionally
/// failing until made ready.
pub(crate) struct Jitted {
    pub(crate) pcs: RefCell<Vec<u64>>,
    pub(crate) ready: Cell<bool>,
    pub(crate) queries: Cell<usize>,
}

impl Jitted {
    pub(crate) fn new(pcs: &[u64]) -> Rc<Self> {
        Rc::new(Jitted {
            pcs: RefCell::new(pcs.to_vec()),
            ready: Cell::new(true),
            queries: Cell::new(0),
        })
    }

    pub(crate) fn not_ready() -> Rc<Self> {
        let jitted = Jitted::new(&[]);
        jitted.ready.set(false);
        jitted
    }
}

impl FrameClassifier for Jitted {
    fn is_jitted(&self, _fp: u64, pc: u64) -> Result<bool> {
        self.queries.set(self.queries.get() + 1);
        if !self.ready.get() {
            return Err(Error::ClassifierNotReady("target not attached".into()));
        }
        Ok(self.pcs.borrow().contains(&pc))
    }
}

/// A classifier that always fails.
pub(crate) fn broken() -> Rc<impl FrameClassifier> {
    Rc::new(classify::from_fn(|_, _| {
        Err(Error::ClassifierNotReady("no symbol \"tc_base\" in current context".into()))
    }))
}
