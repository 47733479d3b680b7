//! A debugger unwinder for stacks that run through JIT-generated code.
//!
//! JIT code usually ships without call frame information, so a debugger's
//! default unwinders stop (or go off the rails) at the first JIT frame. As
//! long as the generated code keeps frame pointers, the frame pointer chain
//! is all that's needed to get through it. [`unwinder::JitUnwinder`] does
//! exactly that for frames a [`classify::FrameClassifier`] puts into the VM's
//! code cache, and leaves everything else to the host.
//!
//! The host debugger is abstracted behind the traits in [`host`]; [`walk`]
//! has a small host to run against captured stacks.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
extern crate tracing;

pub mod arch;
pub mod classify;
pub mod command;
pub mod config;
mod error;
pub mod host;
pub mod lifecycle;
pub mod stdext;
pub mod unwinder;
pub mod walk;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
