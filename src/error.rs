use alloc::string::String;

/// Everything that can go wrong while installing the unwinder or unwinding a
/// single frame. None of these are fatal to the debugger session: they either
/// turn into "not installed" or truncate the backtrace at the failing frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The frame classifier can't answer yet (no target, VM symbols not loaded).
    #[error("frame classifier is not ready: {0}")]
    ClassifierNotReady(String),

    /// The debugger is not attached to a live target.
    #[error("no frame is currently selected")]
    NoTarget,

    #[error("cannot access {len} bytes of target memory at {addr:#x}")]
    MemoryRead { addr: u64, len: usize },

    #[error("register `{0}` is not available in this frame")]
    UnknownRegister(String),

    /// The built-in unwinder has no call frame information for this pc.
    #[error("no unwind information for pc {0:#x}")]
    NoUnwindInfo(u64),

    #[error("address computation overflowed for frame pointer {0:#x}")]
    AddressOverflow(u64),

    #[error("an unwinder named `{0}` is already registered")]
    DuplicateUnwinder(String),

    #[error("undefined unwinder command: \"{0}\"")]
    UnknownCommand(String),

    /// The unwound caller claims a stack pointer below the callee's.
    #[error("previous frame inner to this frame (corrupt stack?)")]
    FrameInnerToPrevious,

    #[error("previous frame identical to this frame (corrupt stack?)")]
    FrameIdentical,

    #[error("failed to write command output")]
    Output,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Error::Output
    }
}
