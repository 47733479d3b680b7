//! Unwinding through JIT-generated code.
//!
//! JIT code has no call frame information, but it keeps frame pointers. Every
//! JIT frame therefore looks like this from its frame pointer upwards:
//!
//! ```text
//!   [caller's frame pointer] [return address] [... caller's frame]
//!   ^ fp                     ^ fp + 8         ^ fp + 16
//! ```
//!
//! so the caller's frame pointer and pc can be read straight off the stack.
//! The caller's stack pointer is another story: JIT code moves it around
//! without telling anyone. There are two cases:
//!
//! - the caller is JIT code as well. Its stack pointer is just as unknown, so
//!   the current one is carried over. The `.eh_frame` the VM registers for
//!   its code cache does the same thing.
//! - the caller is native code. The only native code that calls into the
//!   code cache is the entry trampoline, whose prologue pushes exactly a
//!   frame pointer and a return address, so its stack pointer is `fp + 16`.
//!
//! The frame id can't use the real stack pointer either. It uses the current
//! stack pointer instead, which is the stack pointer of the most recent call
//! into native code. The host requires frame ids to be nondecreasing in the
//! stack pointer while unwinding, so the frame pointer is no good here.


use alloc::{rc::Rc, string::String};

use crate::arch::{Arch, RegisterProfile};
use crate::classify::FrameClassifier;
use crate::error::{Error, Result};
use crate::host::{Debugger, FrameId, PendingFrame, UnwindInfo, Unwinder, WORD_SIZE};

/// Offset from a trampoline's frame pointer to its caller-side stack pointer.
const TRAMPOLINE_SP_OFFSET: u64 = 2 * WORD_SIZE;

/// Chases the frame pointer chain through frames the classifier puts into
/// JIT code and leaves every other frame to the host's unwinders.
#[derive(Debug)]
pub struct JitUnwinder<C> {
    name: String,
    arch: Arch,
    regs: RegisterProfile,
    classifier: Rc<C>,
}

impl<C: FrameClassifier> JitUnwinder<C> {
    /// The register names are picked here, once, from the newest frame.
    pub fn new(debugger: &dyn Debugger, classifier: Rc<C>, name: impl Into<String>) -> Self {
        let arch = Arch::resolve(debugger);
        Self {
            name: name.into(),
            arch,
            regs: arch.profile(),
            classifier,
        }
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    fn unwind_jitted(
        &self,
        frame: &dyn PendingFrame,
        fp: u64,
        sp: u64,
        pc: u64,
    ) -> Result<UnwindInfo> {
        let mut info = UnwindInfo::new(FrameId { sp, pc });

        let return_addr_slot = fp.checked_add(WORD_SIZE).ok_or(Error::AddressOverflow(fp))?;
        let saved_fp = frame.read_word(fp)?;
        let return_addr = frame.read_word(return_addr_slot)?;
        trace!("saved fp={saved_fp:#x} return address={return_addr:#x}");

        info.add_saved_register(self.regs.frame, saved_fp);
        info.add_saved_register(self.regs.pc, return_addr);

        let caller_sp = if self.classifier.is_jitted(saved_fp, return_addr)? {
            sp
        } else {
            debug!("caller is the entry trampoline");
            fp.checked_add(TRAMPOLINE_SP_OFFSET)
                .ok_or(Error::AddressOverflow(fp))?
        };
        info.add_saved_register(self.regs.stack, caller_sp);

        Ok(info)
    }
}

impl<C: FrameClassifier> Unwinder for JitUnwinder<C> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "trace", skip_all)]
    fn unwind(&self, frame: &dyn PendingFrame) -> Result<Option<UnwindInfo>> {
        let fp = frame.read_register(self.regs.frame)?;
        let sp = frame.read_register(self.regs.stack)?;
        let pc = frame.read_register(self.regs.pc)?;
        trace!("fp={fp:#x} sp={sp:#x} pc={pc:#x}");

        match self.classifier.is_jitted(fp, pc) {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(err) => {
                debug!(%err, "classifier failed, leaving frame to the default unwinders");
                return Ok(None);
            }
        }

        match self.unwind_jitted(frame, fp, sp, pc) {
            Ok(info) => {
                debug!(?info, "unwound JIT frame");
                Ok(Some(info))
            }
            Err(err) => {
                debug!(%err, "cannot unwind JIT frame at fp={fp:#x}");
                Err(err)
            }
        }
    }
}
