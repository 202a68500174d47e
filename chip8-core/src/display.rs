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

//! The display collaborator interface and the CHIP-8/SCHIP display modes.

/// Resolution the interpreter is currently rendering at.
///
/// `00FE`/`00FF` toggle this, clearing the framebuffer and resizing it in
/// the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "savestates", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayMode {
    /// Classic 64x32 CHIP-8 resolution.
    Standard,
    /// SCHIP 128x64 resolution.
    Extended,
}

impl DisplayMode {
    /// Width and height, in pixels, of this mode.
    pub fn dimensions(self) -> (usize, usize) {
        match self {
            DisplayMode::Standard => (64, 32),
            DisplayMode::Extended => (128, 64),
        }
    }

    /// Total number of pixels covered by this mode.
    pub fn pixel_count(self) -> usize {
        let (w, h) = self.dimensions();
        w * h
    }
}

/// Abstract sink for display-mode changes.
///
/// The core notifies the host whenever `00FE`/`00FF` change the active
/// resolution; the host is expected to read [`crate::cpu::CPU::framebuffer`]
/// itself once per frame rather than have pixels pushed to it.
pub trait DisplaySink {
    /// Called whenever the interpreter's resolution changes.
    fn set_display_properties(&mut self, width: usize, height: usize);
}

/// A [`DisplaySink`] that does nothing.
///
/// Useful for tests, and for hosts that poll
/// [`crate::cpu::CPU::display_mode`] instead of reacting to the callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn set_display_properties(&mut self, _width: usize, _height: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_mode_is_64x32() {
        assert_eq!(DisplayMode::Standard.dimensions(), (64, 32));
        assert_eq!(DisplayMode::Standard.pixel_count(), 64 * 32);
    }

    #[test]
    fn extended_mode_is_128x64() {
        assert_eq!(DisplayMode::Extended.dimensions(), (128, 64));
        assert_eq!(DisplayMode::Extended.pixel_count(), 128 * 64);
    }
}
