//! Built-in frame pointer unwinder, used when no registered unwinder claims
//! a frame. Assumes the usual prologue (`push rbp; mov rbp, rsp`), i.e. the
//! saved frame pointer at `[fp]` and the return address at `[fp + 8]`.

use crate::arch::RegisterProfile;
use crate::error::{Error, Result};
use crate::host::{FrameId, PendingFrame, UnwindInfo, WORD_SIZE};

#[instrument(level = "trace", skip_all)]
pub(crate) fn unwind(frame: &dyn PendingFrame, regs: RegisterProfile) -> Result<UnwindInfo> {
    let fp = frame.read_register(regs.frame)?;
    let sp = frame.read_register(regs.stack)?;
    let pc = frame.read_register(regs.pc)?;

    let caller_sp = fp
        .checked_add(2 * WORD_SIZE)
        .ok_or(Error::AddressOverflow(fp))?;
    let saved_fp = frame.read_word(fp)?;
    let return_addr = frame.read_word(fp + WORD_SIZE)?;
    trace!("walk... fp={fp:#x} return_addr={return_addr:#x}");

    let mut info = UnwindInfo::new(FrameId { sp, pc });
    info.add_saved_register(regs.frame, saved_fp);
    info.add_saved_register(regs.pc, return_addr);
    info.add_saved_register(regs.stack, caller_sp);
    Ok(info)
}
