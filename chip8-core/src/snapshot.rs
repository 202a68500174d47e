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

//! Save-state serialisation.
//!
//! A [`Snapshot`] captures everything needed to resume a run except the ROM
//! image itself, which the host is expected to already have loaded. Rather
//! than dump the full 4 KiB working copy of program memory, only the
//! contiguous range that differs from the original ROM is kept, mirroring
//! the approach the source takes in its core dump routine.

use crate::display::DisplayMode;
use crate::error::SnapshotError;
use crate::keypad::KEY_COUNT;

/// A complete, portable dump of interpreter state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "savestates", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Program counter at the moment of the dump.
    pub pc: u16,
    /// Call stack contents (only `sp` slots are meaningful).
    pub stack: [u16; 16],
    /// Call stack pointer.
    pub sp: u8,
    /// General purpose registers V0..VF.
    pub registers: [u8; 16],
    /// Address register.
    pub i: u16,
    /// Delay timer.
    pub delay: u8,
    /// Sound timer.
    pub sound: u8,
    /// Halt flag.
    pub halted: bool,
    /// Raw keypad down/up state at the moment of the dump.
    pub key_table: [bool; KEY_COUNT],
    /// Active display mode.
    pub display_mode: DisplayMode,
    /// Full framebuffer contents, `display_mode.pixel_count()` bytes.
    pub vram: Vec<u8>,
    /// HP-48 flag store.
    pub flag_regs: [u8; 8],
    /// Address (relative to 0x000) of the first byte of `modified_memory`.
    pub modified_memory_lower_bound: u16,
    /// The contiguous slice of program memory, starting at
    /// `modified_memory_lower_bound`, that differs from the original ROM
    /// image (or, if nothing differs, an empty slice).
    pub modified_memory: Vec<u8>,
}

impl Snapshot {
    /// Validate that the snapshot is internally consistent: the VRAM size
    /// matches its own display mode, and the modified-memory range sits
    /// within the addressable program area.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let expected_vram = self.display_mode.pixel_count();

        if self.vram.len() != expected_vram {
            return Err(SnapshotError::VramSizeMismatch {
                expected: expected_vram,
                found: self.vram.len(),
            });
        }

        let lower = self.modified_memory_lower_bound as usize;
        let upper = lower + self.modified_memory.len();

        if lower < 0x200 || upper > 0x1000 {
            return Err(SnapshotError::RangeOutOfBounds { lower, upper });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_vram() {
        let snap = Snapshot {
            pc: 0x200,
            stack: [0; 16],
            sp: 0,
            registers: [0; 16],
            i: 0,
            delay: 0,
            sound: 0,
            halted: false,
            key_table: [false; KEY_COUNT],
            display_mode: DisplayMode::Standard,
            vram: vec![0; 10],
            flag_regs: [0; 8],
            modified_memory_lower_bound: 0x200,
            modified_memory: vec![],
        };

        assert_eq!(
            snap.validate(),
            Err(SnapshotError::VramSizeMismatch {
                expected: DisplayMode::Standard.pixel_count(),
                found: 10,
            })
        );
    }

    #[test]
    fn rejects_out_of_bounds_range() {
        let snap = Snapshot {
            pc: 0x200,
            stack: [0; 16],
            sp: 0,
            registers: [0; 16],
            i: 0,
            delay: 0,
            sound: 0,
            halted: false,
            key_table: [false; KEY_COUNT],
            display_mode: DisplayMode::Standard,
            vram: vec![0; DisplayMode::Standard.pixel_count()],
            flag_regs: [0; 8],
            modified_memory_lower_bound: 0x0F0,
            modified_memory: vec![0; 4],
        };

        assert!(snap.validate().is_err());
    }
}
