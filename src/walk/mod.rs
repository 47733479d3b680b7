//! A small debugger host: an unwinder chain and a backtrace loop over a
//! [`Snapshot`].
//!
//! The backtrace loop follows the host rules the JIT unwinder is written
//! against: custom unwinders get the first look at every frame, the built-in
//! frame pointer unwinder takes what they decline, and the walk stops as soon
//! as frame ids stop moving outwards.

mod fp;
mod snapshot;

pub use snapshot::Snapshot;

use alloc::{boxed::Box, collections::BTreeMap, string::String, vec::Vec};
use core::fmt;

use crate::arch::{Arch, RegisterProfile};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::{Debugger, FrameId, PendingFrame, UnwindInfo, Unwinder};

/// Name reported for frames unwound by the built-in unwinder.
pub const BUILTIN_UNWINDER: &str = "frame-pointer";

struct Registered {
    unwinder: Box<dyn Unwinder>,
    enabled: bool,
}

/// One debugger session: registered unwinders plus, once attached, a target.
pub struct Session {
    config: Config,
    unwinders: Vec<Registered>,
    target: Option<Snapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub pc: u64,
    pub fp: u64,
    pub sp: u64,
    /// Set once the frame has been unwound.
    pub id: Option<FrameId>,
    /// Name of the unwinder that unwound this frame.
    pub unwinder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backtrace {
    /// Newest frame first.
    pub frames: Vec<Frame>,
    /// Why unwinding stopped before the outermost frame, if it did.
    pub truncated: Option<Error>,
}

/// A frame as handed to unwinders: its registers, the target's memory.
struct Pending<'a> {
    registers: &'a BTreeMap<String, u64>,
    target: &'a Snapshot,
}

impl PendingFrame for Pending<'_> {
    fn read_register(&self, name: &str) -> Result<u64> {
        self.registers
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownRegister(name.into()))
    }

    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        self.target.read_memory(addr, buf)
    }
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            unwinders: Vec::new(),
            target: None,
        }
    }

    pub fn attach(&mut self, target: Snapshot) {
        debug!(arch = target.arch(), "attached");
        self.target = Some(target);
    }

    pub fn detach(&mut self) -> Option<Snapshot> {
        self.target.take()
    }

    pub fn target(&self) -> Option<&Snapshot> {
        self.target.as_ref()
    }

    /// Registered unwinders in the order they are consulted.
    pub fn unwinders(&self) -> impl Iterator<Item = (&str, bool)> {
        self.unwinders
            .iter()
            .map(|registered| (registered.unwinder.name(), registered.enabled))
    }

    /// Returns whether an unwinder with this name exists.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self
            .unwinders
            .iter_mut()
            .find(|registered| registered.unwinder.name() == name)
        {
            Some(registered) => {
                registered.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Walk the stack of the attached target, newest frame first.
    #[instrument(level = "debug", skip_all)]
    pub fn backtrace(&self) -> Result<Backtrace> {
        let target = self.target.as_ref().ok_or(Error::NoTarget)?;
        let regs = Arch::from_name(target.arch()).profile();
        let mut registers = target.registers().clone();

        let mut frames: Vec<Frame> = Vec::new();
        let mut truncated = None;
        while frames.len() < self.config.backtrace_limit {
            let pending = Pending {
                registers: &registers,
                target,
            };
            let (pc, fp, sp) = match frame_registers(&pending, regs) {
                Ok(values) => values,
                Err(err) => {
                    truncated = Some(err);
                    break;
                }
            };
            if pc == 0 {
                break;
            }

            let mut frame = Frame {
                pc,
                fp,
                sp,
                id: None,
                unwinder: None,
            };
            let (name, info) = match self.unwind_one(&pending, regs, pc, fp) {
                Ok(Some(unwound)) => unwound,
                Ok(None) => {
                    frames.push(frame);
                    break;
                }
                Err(err) => {
                    debug!(%err, "backtrace stopped at frame #{}", frames.len());
                    frames.push(frame);
                    truncated = Some(err);
                    break;
                }
            };

            frame.id = Some(info.id);
            frame.unwinder = Some(name.into());
            let previous = frames.last().and_then(|frame| frame.id);
            frames.push(frame);
            if let Some(previous) = previous {
                if info.id == previous {
                    truncated = Some(Error::FrameIdentical);
                    break;
                }
                if info.id.sp < previous.sp {
                    truncated = Some(Error::FrameInnerToPrevious);
                    break;
                }
            }

            for &(register, value) in info.saved_registers() {
                registers.insert(register.into(), value);
            }
        }

        Ok(Backtrace { frames, truncated })
    }

    /// `Ok(None)`: this is the outermost frame.
    fn unwind_one<'s>(
        &'s self,
        frame: &Pending<'_>,
        regs: RegisterProfile,
        pc: u64,
        fp: u64,
    ) -> Result<Option<(&'s str, UnwindInfo)>> {
        for registered in self.unwinders.iter().filter(|registered| registered.enabled) {
            let unwinder = &registered.unwinder;
            if let Some(info) = unwinder.unwind(frame)? {
                return Ok(Some((unwinder.name(), info)));
            }
        }
        if fp == 0 {
            return Ok(None);
        }
        if !frame.target.has_unwind_info(pc) {
            return Err(Error::NoUnwindInfo(pc));
        }
        Ok(Some((BUILTIN_UNWINDER, fp::unwind(frame, regs)?)))
    }
}

fn frame_registers(frame: &dyn PendingFrame, regs: RegisterProfile) -> Result<(u64, u64, u64)> {
    Ok((
        frame.read_register(regs.pc)?,
        frame.read_register(regs.frame)?,
        frame.read_register(regs.stack)?,
    ))
}

impl Debugger for Session {
    fn newest_frame_architecture(&self) -> Result<String> {
        self.target
            .as_ref()
            .map(|target| target.arch().into())
            .ok_or(Error::NoTarget)
    }

    /// New unwinders go in front of the ones already registered.
    fn register_unwinder(&mut self, unwinder: Box<dyn Unwinder>) -> Result<()> {
        let name = unwinder.name();
        if self.unwinders().any(|(registered, _)| registered == name) {
            return Err(Error::DuplicateUnwinder(name.into()));
        }
        debug!(name, "registered unwinder");
        self.unwinders.insert(
            0,
            Registered {
                unwinder,
                enabled: true,
            },
        );
        Ok(())
    }
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (level, frame) in self.frames.iter().enumerate() {
            write!(
                f,
                "#{level:<3}{:#018x} fp={:#x} sp={:#x}",
                frame.pc, frame.fp, frame.sp
            )?;
            if let Some(unwinder) = &frame.unwinder {
                write!(f, " [{unwinder}]")?;
            }
            writeln!(f)?;
        }
        if let Some(err) = &self.truncated {
            writeln!(f, "Backtrace stopped: {err}")?;
        }
        Ok(())
    }
}
