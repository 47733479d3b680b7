use crate::host::Debugger;

/// The architecture families the unwinder knows register names for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
}

/// Concrete register names for the three registers the unwinder touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterProfile {
    pub frame: &'static str,
    pub stack: &'static str,
    pub pc: &'static str,
}

const X86_64: RegisterProfile = RegisterProfile {
    frame: "rbp",
    stack: "rsp",
    pc: "rip",
};

const AARCH64: RegisterProfile = RegisterProfile {
    frame: "x29",
    stack: "sp",
    pc: "pc",
};

impl Arch {
    /// Map a host architecture name. Anything that isn't `aarch64` gets the
    /// x86-64 register names.
    pub fn from_name(name: &str) -> Arch {
        match name {
            "aarch64" => Arch::Aarch64,
            _ => Arch::X86_64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Arch::X86_64 => "i386:x86-64",
            Arch::Aarch64 => "aarch64",
        }
    }

    pub fn profile(self) -> RegisterProfile {
        match self {
            Arch::X86_64 => X86_64,
            Arch::Aarch64 => AARCH64,
        }
    }

    /// Ask the host for the newest frame's architecture. Without a live
    /// target this is x86-64, whatever the target later turns out to be.
    #[instrument(level = "debug", skip_all)]
    pub fn resolve(debugger: &dyn Debugger) -> Arch {
        match debugger.newest_frame_architecture() {
            Ok(name) => {
                let arch = Arch::from_name(&name);
                debug!(%name, ?arch, "resolved architecture");
                arch
            }
            Err(err) => {
                debug!(%err, "no architecture available, assuming x86-64");
                Arch::X86_64
            }
        }
    }
}
