/*
Copyright 2020 Anish Jewalikar

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Error types returned by the interpreter.
//!
//! The core never panics on a malformed ROM. Unknown opcodes are skipped
//! (see [`crate::cpu::CPU::step`]); the errors here cover the cases the
//! source specifically calls out as fatal or rejectable.

use thiserror::Error;

/// A ROM could not be loaded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RomError {
    /// The ROM buffer is larger than the `0x200..=0xFFF` program area.
    #[error("ROM is {len} bytes, which exceeds the {max} byte limit")]
    TooLarge {
        /// Size of the rejected buffer.
        len: usize,
        /// Maximum permitted size (3584 bytes).
        max: usize,
    },
}

/// A fatal condition encountered while executing an instruction.
///
/// A fault is not recoverable by the VM itself: the CPU latches
/// [`crate::cpu::CPU::is_halted`] and keeps the fault around for the host to
/// inspect via [`crate::cpu::CPU::fault`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CpuFault {
    /// `2NNN CALL` was executed with the call stack already full.
    #[error("call stack overflow: all 16 slots are in use")]
    StackOverflow,

    /// `00EE RET` was executed with an empty call stack.
    #[error("call stack underflow: no return address to pop")]
    StackUnderflow,
}

/// A snapshot could not be restored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// The snapshot's VRAM buffer does not match the dimensions implied by
    /// its own display mode.
    #[error("snapshot vram has {found} pixels, expected {expected} for its display mode")]
    VramSizeMismatch {
        /// Expected pixel count for the snapshot's display mode.
        expected: usize,
        /// Pixel count actually present in the snapshot.
        found: usize,
    },

    /// The modified-memory range recorded in the snapshot falls outside
    /// the addressable ROM area.
    #[error("modified memory range {lower:#05X}..{upper:#05X} is out of bounds")]
    RangeOutOfBounds {
        /// Lower bound recorded in the snapshot.
        lower: usize,
        /// Upper bound implied by the recorded range's length.
        upper: usize,
    },

    /// The snapshot's `modified_memory_lower_bound` sits past the end of
    /// the ROM currently loaded, so there is no well-defined unmodified
    /// prefix to rebuild memory from (the snapshot was very likely taken
    /// against a different, longer ROM).
    #[error(
        "snapshot expects {needed} unmodified ROM bytes before its modified range, \
         but the loaded ROM is only {available} bytes long"
    )]
    RomTooShort {
        /// Number of ROM bytes the snapshot's lower bound implies.
        needed: usize,
        /// Length of the ROM actually loaded.
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_error_message_reports_the_offending_size() {
        let err = RomError::TooLarge { len: 4000, max: 3584 };
        assert_eq!(
            err.to_string(),
            "ROM is 4000 bytes, which exceeds the 3584 byte limit"
        );
    }

    #[test]
    fn cpu_fault_messages_are_distinct() {
        assert_ne!(
            CpuFault::StackOverflow.to_string(),
            CpuFault::StackUnderflow.to_string()
        );
    }
}
