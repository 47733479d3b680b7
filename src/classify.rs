//! Deciding whether a frame belongs to JIT-generated code.
//!
//! The answer depends on the VM's own bookkeeping (where its translation
//! cache lives), so the unwinder only sees the [`FrameClassifier`] trait.
//! Every query has to be cheap: the unwinder asks twice per frame.

use alloc::vec::Vec;
use core::{cell::OnceCell, fmt, ops::Range};

use crate::error::Result;

pub trait FrameClassifier {
    /// Whether the frame with this frame pointer and pc runs JIT code. Must
    /// accept `(0, 0)` as a readiness check, and fail rather than guess when
    /// the VM state isn't available yet.
    fn is_jitted(&self, fp: u64, pc: u64) -> Result<bool>;
}

/// A classifier backed by a closure.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(u64, u64) -> Result<bool>,
{
    FromFn(f)
}

#[derive(Clone)]
pub struct FromFn<F>(F);

impl<F> FrameClassifier for FromFn<F>
where
    F: Fn(u64, u64) -> Result<bool>,
{
    fn is_jitted(&self, fp: u64, pc: u64) -> Result<bool> {
        (self.0)(fp, pc)
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Code regions of the VM. A frame is JIT code if its pc falls into one of
/// them; the frame pointer plays no part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeRanges {
    ranges: Vec<Range<u64>>,
}

impl CodeRanges {
    pub fn new(ranges: Vec<Range<u64>>) -> Self {
        Self { ranges }
    }

    pub fn contains(&self, pc: u64) -> bool {
        self.ranges.iter().any(|range| range.contains(&pc))
    }
}

impl FrameClassifier for CodeRanges {
    fn is_jitted(&self, _fp: u64, pc: u64) -> Result<bool> {
        Ok(self.contains(pc))
    }
}

/// [`CodeRanges`] that are looked up on first use.
///
/// The resolver typically reads the VM's globals through the debugger and
/// fails until the target is attached and its symbols are loaded. A failed
/// lookup is retried on the next query; the first successful one sticks.
pub struct Deferred<F> {
    resolve: F,
    ranges: OnceCell<CodeRanges>,
}

impl<F> Deferred<F>
where
    F: Fn() -> Result<CodeRanges>,
{
    pub fn new(resolve: F) -> Self {
        Self {
            resolve,
            ranges: OnceCell::new(),
        }
    }

    fn ranges(&self) -> Result<&CodeRanges> {
        if let Some(ranges) = self.ranges.get() {
            return Ok(ranges);
        }
        let ranges = (self.resolve)()?;
        trace!(?ranges, "resolved JIT code ranges");
        Ok(self.ranges.get_or_init(|| ranges))
    }
}

impl<F> FrameClassifier for Deferred<F>
where
    F: Fn() -> Result<CodeRanges>,
{
    fn is_jitted(&self, fp: u64, pc: u64) -> Result<bool> {
        self.ranges()?.is_jitted(fp, pc)
    }
}

impl<F> fmt::Debug for Deferred<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("ranges", &self.ranges.get())
            .finish_non_exhaustive()
    }
}
