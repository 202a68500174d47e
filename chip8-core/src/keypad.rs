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

//! The keypad collaborator interface.
//!
//! The core never decides how a physical key maps onto the 16-key pad; it
//! only asks whatever implementation the host hands it. A host typically
//! owns one [`Keypad`] implementation, mutates it from its event loop, and
//! passes it into [`crate::cpu::CPU::new`] or by value on construction.

/// Number of keys on the hexadecimal keypad.
pub const KEY_COUNT: usize = 16;

/// Abstract source of keypad state.
///
/// `Ex9E`/`ExA1` query [`Keypad::key_is_down`], `Fx0A` polls
/// [`Keypad::key_count`] and [`Keypad::last_key`], and snapshotting uses
/// [`Keypad::get_key_table`]/[`Keypad::set_key_table`] to persist and
/// restore the raw key states.
pub trait Keypad {
    /// Is the key with the given id (`0..=15`) currently held down?
    fn key_is_down(&self, id: u8) -> bool;

    /// Number of keys currently held down.
    fn key_count(&self) -> u32;

    /// Id of the most recently pressed key.
    ///
    /// Only meaningful when [`Keypad::key_count`] is non-zero; the value is
    /// unspecified otherwise.
    fn last_key(&self) -> u8;

    /// Snapshot the raw down/up state of every key.
    fn get_key_table(&self) -> [bool; KEY_COUNT];

    /// Restore the raw down/up state of every key.
    fn set_key_table(&mut self, table: [bool; KEY_COUNT]);
}

/// A straightforward [`Keypad`] backed by a fixed boolean array.
///
/// Hosts that just forward "key N went down/up" events from a windowing
/// toolkit can use this directly instead of writing their own.
#[derive(Debug, Clone, Copy)]
pub struct ArrayKeypad {
    down: [bool; KEY_COUNT],
    last_key: u8,
}

impl Default for ArrayKeypad {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayKeypad {
    /// Create a keypad with every key up.
    pub fn new() -> Self {
        Self {
            down: [false; KEY_COUNT],
            last_key: 0,
        }
    }

    /// Mark `id` as pressed or released, tracking it as the last pressed
    /// key on a press edge.
    pub fn set_key(&mut self, id: u8, is_down: bool) {
        if (id as usize) >= KEY_COUNT {
            return;
        }

        if is_down {
            self.last_key = id;
        }

        self.down[id as usize] = is_down;
    }

    /// Release every key.
    pub fn release_all(&mut self) {
        self.down = [false; KEY_COUNT];
    }
}

impl Keypad for ArrayKeypad {
    fn key_is_down(&self, id: u8) -> bool {
        self.down.get(id as usize).copied().unwrap_or(false)
    }

    fn key_count(&self) -> u32 {
        self.down.iter().filter(|&&k| k).count() as u32
    }

    fn last_key(&self) -> u8 {
        self.last_key
    }

    fn get_key_table(&self) -> [bool; KEY_COUNT] {
        self.down
    }

    fn set_key_table(&mut self, table: [bool; KEY_COUNT]) {
        self.down = table;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_key_ignores_out_of_range_ids() {
        let mut keypad = ArrayKeypad::new();
        keypad.set_key(0x10, true);
        keypad.set_key(0xFF, true);

        assert_eq!(keypad.key_count(), 0);
        assert!(!keypad.key_is_down(0x10));
        assert_eq!(keypad.last_key(), 0);
    }

    #[test]
    fn set_key_tracks_down_state_and_last_pressed() {
        let mut keypad = ArrayKeypad::new();
        keypad.set_key(0x3, true);
        keypad.set_key(0x7, true);

        assert!(keypad.key_is_down(0x3));
        assert_eq!(keypad.key_count(), 2);
        assert_eq!(keypad.last_key(), 0x7);

        keypad.set_key(0x7, false);
        assert!(!keypad.key_is_down(0x7));
        assert_eq!(keypad.key_count(), 1);
    }

    #[test]
    fn release_all_clears_every_key_but_not_last_key() {
        let mut keypad = ArrayKeypad::new();
        keypad.set_key(0xA, true);
        keypad.release_all();

        assert_eq!(keypad.key_count(), 0);
        assert_eq!(keypad.last_key(), 0xA);
    }
}
