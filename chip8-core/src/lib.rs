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

//! A simple, full featured (super) Chip-8 interpreter backend.
//!
//! `chip8-core` owns the interpreter loop, memory, and instruction
//! semantics; it knows nothing about windowing, audio, or file I/O. A host
//! supplies a [`Keypad`] and a [`DisplaySink`] at construction time and
//! then drives the interpreter by calling [`CPU::step`] and the timer
//! decrement methods at the appropriate rates.

mod cpu;
mod decode;
mod display;
mod error;
mod font;
mod keypad;
mod snapshot;

pub use cpu::{CPU, MAX_ROM_SIZE};
pub use display::{DisplayMode, DisplaySink, NullDisplay};
pub use error::{CpuFault, RomError, SnapshotError};
pub use keypad::{ArrayKeypad, Keypad, KEY_COUNT};
pub use snapshot::Snapshot;
