use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::ops::Range;

use crate::arch::Arch;
use crate::error::{Error, Result};

/// A stopped target: the newest frame's registers plus whatever memory was
/// captured. Anything outside the captured regions is unreadable.
///
/// Code the target has call frame information for is listed separately; the
/// built-in unwinder refuses every other pc, like a host whose only unwinder
/// for native code is CFI based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    arch: String,
    registers: BTreeMap<String, u64>,
    /// Non-overlapping regions keyed by base address.
    memory: BTreeMap<u64, Vec<u8>>,
    unwind_info: Vec<Range<u64>>,
}

impl Snapshot {
    pub fn new(arch: Arch) -> Self {
        Self::with_arch_name(arch.name())
    }

    /// For targets whose architecture name the unwinder doesn't know.
    pub fn with_arch_name(arch: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            registers: BTreeMap::new(),
            memory: BTreeMap::new(),
            unwind_info: Vec::new(),
        }
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn set_register(&mut self, name: impl Into<String>, value: u64) -> &mut Self {
        self.registers.insert(name.into(), value);
        self
    }

    pub fn registers(&self) -> &BTreeMap<String, u64> {
        &self.registers
    }

    /// Mark `code` as having call frame information.
    pub fn add_unwind_info(&mut self, code: Range<u64>) -> &mut Self {
        self.unwind_info.push(code);
        self
    }

    pub fn has_unwind_info(&self, pc: u64) -> bool {
        self.unwind_info.iter().any(|code| code.contains(&pc))
    }

    /// Capture `bytes` at `base`, replacing regions it overlaps.
    pub fn map(&mut self, base: u64, bytes: Vec<u8>) -> &mut Self {
        let end = base.saturating_add(bytes.len() as u64);
        self.memory
            .retain(|&start, region| end <= start || start.saturating_add(region.len() as u64) <= base);
        self.memory.insert(base, bytes);
        self
    }

    /// Capture consecutive little-endian words at `base`.
    pub fn map_words(&mut self, base: u64, words: &[u64]) -> &mut Self {
        let bytes = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        self.map(base, bytes)
    }

    /// Reads may span regions as long as they are contiguous.
    pub fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        let unmapped = || Error::MemoryRead { addr, len };

        let mut cursor = addr;
        let mut filled = 0;
        while filled < len {
            let (&start, region) = self.memory.range(..=cursor).next_back().ok_or_else(unmapped)?;
            let available = usize::try_from(cursor - start)
                .ok()
                .and_then(|offset| region.get(offset..))
                .filter(|rest| !rest.is_empty())
                .ok_or_else(unmapped)?;
            let n = available.len().min(len - filled);
            buf[filled..filled + n].copy_from_slice(&available[..n]);
            filled += n;
            if filled < len {
                cursor = cursor.checked_add(n as u64).ok_or_else(unmapped)?;
            }
        }
        Ok(())
    }
}
