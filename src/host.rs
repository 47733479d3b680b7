//! The slice of the host debugger's extension API that the unwinder needs.
//!
//! A debugger that wants JIT-aware backtraces implements [`Debugger`] and
//! hands out [`PendingFrame`]s while it builds a backtrace. The unwinder never
//! touches the target directly, so the same algorithm runs against a live
//! debugger, a core file or the in-memory [`crate::walk::Snapshot`].

use alloc::{boxed::Box, string::String, vec::Vec};

use crate::error::{Error, Result};

/// Size of a machine word on every supported architecture.
pub const WORD_SIZE: u64 = 8;

/// A frame the host is in the middle of unwinding. Read-only: recovered
/// values for the caller go into an [`UnwindInfo`].
pub trait PendingFrame {
    fn read_register(&self, name: &str) -> Result<u64>;

    /// Fill `buf` with target memory starting at `addr`. Fails if any byte
    /// of the range is not mapped.
    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<()>;

    /// Read one little-endian machine word.
    fn read_word(&self, addr: u64) -> Result<u64> {
        let mut buf = [0; WORD_SIZE as usize];
        self.read_memory(addr, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// What the host uses to tell frames apart. The stack pointer component must
/// never decrease while moving from callee to caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    pub sp: u64,
    pub pc: u64,
}

/// Recovered caller state for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwindInfo {
    pub id: FrameId,
    saved: Vec<(&'static str, u64)>,
}

impl UnwindInfo {
    pub fn new(id: FrameId) -> Self {
        Self {
            id,
            saved: Vec::new(),
        }
    }

    /// Record the caller's value for `register`, replacing an earlier value.
    pub fn add_saved_register(&mut self, register: &'static str, value: u64) {
        match self.saved.iter_mut().find(|(name, _)| *name == register) {
            Some(slot) => slot.1 = value,
            None => self.saved.push((register, value)),
        }
    }

    pub fn saved_register(&self, register: &str) -> Option<u64> {
        self.saved
            .iter()
            .find(|(name, _)| *name == register)
            .map(|&(_, value)| value)
    }

    pub fn saved_registers(&self) -> &[(&'static str, u64)] {
        &self.saved
    }
}

/// A custom unwinder as the host sees it.
pub trait Unwinder {
    fn name(&self) -> &str;

    /// `Ok(None)` leaves the frame to the next unwinder in the chain; `Err`
    /// means the frame can't be unwound and the backtrace ends here.
    fn unwind(&self, frame: &dyn PendingFrame) -> Result<Option<UnwindInfo>>;
}

/// Host services used while installing the unwinder.
pub trait Debugger {
    /// Architecture name of the newest frame, e.g. `"i386:x86-64"`.
    /// Fails with [`Error::NoTarget`] when nothing is running.
    fn newest_frame_architecture(&self) -> Result<String>;

    /// Install `unwinder` for every thread and object file, ahead of the
    /// built-in unwinders.
    fn register_unwinder(&mut self, unwinder: Box<dyn Unwinder>) -> Result<()>;
}
