use alloc::string::String;

/// Knobs shared by the unwinder and the in-crate host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name the unwinder is registered under. The host rejects duplicates.
    pub unwinder_name: String,
    /// Maximum number of frames `walk::Session::backtrace` produces.
    pub backtrace_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unwinder_name: String::from("jit_unwinder"),
            backtrace_limit: 256,
        }
    }
}
