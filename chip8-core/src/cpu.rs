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

//! The (super) Chip-8 interpreter itself.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::decode::Decoded;
use crate::display::{DisplayMode, DisplaySink};
use crate::error::{CpuFault, RomError, SnapshotError};
use crate::font::{LARGE_FONT, LARGE_FONT_BASE, SMALL_FONT, SMALL_FONT_BASE};
use crate::keypad::Keypad;
use crate::snapshot::Snapshot;

/// Size of the addressable memory space.
const MEMORY_SIZE: usize = 0x1000;

/// First address available to a loaded ROM.
const ROM_START: usize = 0x200;

/// Largest ROM the interpreter will accept: the program area runs from
/// [`ROM_START`] through `0xFFF` inclusive.
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START;

/// Implementation of a (super) Chip-8 interpreter.
///
/// `K` and `D` are the keypad and display collaborators the host supplies
/// at construction time (see [`Keypad`] and [`DisplaySink`]). The CPU owns
/// both, and the host reaches them back through [`CPU::keypad_mut`] and
/// [`CPU::display_mut`].
///
/// # Example
///
/// ```rust
/// use chip8_core::{ArrayKeypad, NullDisplay, CPU};
///
/// let mut cpu = CPU::new(ArrayKeypad::new(), NullDisplay, &[0x00, 0xE0]).unwrap();
/// cpu.step();
/// ```
pub struct CPU<K: Keypad, D: DisplaySink> {
    /// Working RAM of the CPU, 4 KiB in size.
    memory: Box<[u8; MEMORY_SIZE]>,

    /// The original ROM image, kept around so `reset` and `snapshot` can
    /// tell program memory apart from self-modified scratch space.
    rom: Vec<u8>,

    /// Return address stack.
    stack: [u16; 16],

    /// Stack pointer; points at the next free slot.
    sp: u8,

    /// Sixteen general purpose registers, V0 through VF.
    registers: [u8; 16],

    /// Program counter.
    pc: u16,

    /// Address register.
    i: u16,

    /// Delay timer, decremented at 60Hz by the host.
    dt: u8,

    /// Sound timer, decremented at 60Hz by the host.
    st: u8,

    /// Video memory, one byte per pixel, row major. Resized on every
    /// display mode change.
    vram: Vec<u8>,

    /// Active display resolution.
    display_mode: DisplayMode,

    /// SCHIP HP-48 flag store.
    flag_regs: [u8; 8],

    /// Set by `00FD END` or while awaiting a key press (`Fx0A`).
    halted: bool,

    /// Set when a CALL/RET touches an already-full or already-empty stack.
    /// A fault is terminal; the CPU will keep re-reporting it every step.
    fault: Option<CpuFault>,

    /// Keypad collaborator.
    keypad: K,

    /// Display collaborator.
    display: D,

    /// Seeded random source backing `Cxkk`.
    rng: StdRng,
}

impl<K: Keypad, D: DisplaySink> CPU<K, D> {
    /// Create a new interpreter, seeding its RNG from OS entropy.
    pub fn new(keypad: K, display: D, rom_bytes: &[u8]) -> Result<Self, RomError> {
        Self::with_rng(keypad, display, rom_bytes, StdRng::from_entropy())
    }

    /// Create a new interpreter with a fixed RNG seed.
    ///
    /// Intended for tests and anything else that needs `Cxkk` to be
    /// reproducible.
    pub fn with_seed(keypad: K, display: D, rom_bytes: &[u8], seed: u64) -> Result<Self, RomError> {
        Self::with_rng(keypad, display, rom_bytes, StdRng::seed_from_u64(seed))
    }

    fn with_rng(keypad: K, display: D, rom_bytes: &[u8], rng: StdRng) -> Result<Self, RomError> {
        validate_rom_size(rom_bytes)?;

        let mut display = display;
        let display_mode = DisplayMode::Standard;
        let (w, h) = display_mode.dimensions();
        display.set_display_properties(w, h);

        Ok(Self {
            memory: build_memory(rom_bytes),
            rom: rom_bytes.to_vec(),
            stack: [0; 16],
            sp: 0,
            registers: [0; 16],
            pc: ROM_START as u16,
            i: 0,
            dt: 0,
            st: 0,
            vram: vec![0; display_mode.pixel_count()],
            display_mode,
            flag_regs: [0; 8],
            halted: false,
            fault: None,
            keypad,
            display,
            rng,
        })
    }

    /// Load a ROM into the working memory, replacing whatever program was
    /// there before. Does not otherwise touch registers or timers.
    pub fn load_rom(&mut self, rom_bytes: &[u8]) -> Result<(), RomError> {
        validate_rom_size(rom_bytes)?;
        self.rom = rom_bytes.to_vec();
        self.memory = build_memory(&self.rom);
        Ok(())
    }

    /// Reset the interpreter to its initial state and reload the current
    /// ROM. HP-48 flag registers survive a reset.
    pub fn reset(&mut self) {
        self.memory = build_memory(&self.rom);
        self.registers = [0; 16];
        self.stack = [0; 16];
        self.sp = 0;
        self.pc = ROM_START as u16;
        self.i = 0;
        self.dt = 0;
        self.st = 0;
        self.halted = false;
        self.fault = None;
        self.set_display_mode(DisplayMode::Standard);
    }

    /// Execute one fetch-decode-execute step and return the instruction
    /// that was fetched.
    ///
    /// There is no separate "don't step while halted" guard: while halted
    /// by `00FD END`, the program counter stays put and the very same
    /// instruction is fetched and re-executed every call, which is a no-op.
    /// While halted awaiting a key (`Fx0A`), the same mechanism makes the
    /// instruction naturally re-poll the keypad on each call.
    pub fn step(&mut self) -> u16 {
        let op = self.fetch();
        let decoded = Decoded::new(op);
        self.dispatch(decoded);
        op
    }

    /// Is the CPU currently halted (awaiting a key, or past a SCHIP `END`)?
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The fatal condition that halted the CPU, if any.
    pub fn fault(&self) -> Option<CpuFault> {
        self.fault
    }

    /// Current delay timer value.
    pub fn delay_timer(&self) -> u8 {
        self.dt
    }

    /// Current sound timer value.
    pub fn sound_timer(&self) -> u8 {
        self.st
    }

    /// Decrement the delay timer towards zero. Intended to be called at
    /// 60Hz by the host.
    pub fn decrement_delay_timer(&mut self) {
        self.dt = self.dt.saturating_sub(1);
    }

    /// Decrement the sound timer towards zero. Intended to be called at
    /// 60Hz by the host.
    pub fn decrement_sound_timer(&mut self) {
        self.st = self.st.saturating_sub(1);
    }

    /// The current framebuffer, one byte per pixel (0 or 1), row major.
    pub fn framebuffer(&self) -> &[u8] {
        &self.vram
    }

    /// The active display resolution.
    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Borrow the keypad collaborator so the host can push key events into
    /// it.
    pub fn keypad_mut(&mut self) -> &mut K {
        &mut self.keypad
    }

    /// Borrow the keypad collaborator.
    pub fn keypad(&self) -> &K {
        &self.keypad
    }

    /// Borrow the display collaborator.
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Read-only access to the general purpose registers, V0 through VF.
    pub fn registers(&self) -> &[u8; 16] {
        &self.registers
    }

    /// Current value of the address register.
    pub fn address_register(&self) -> u16 {
        self.i
    }

    /// Current program counter.
    pub fn program_counter(&self) -> u16 {
        self.pc
    }

    /// Capture a portable dump of the current interpreter state.
    pub fn snapshot(&self) -> Snapshot {
        let (lower, modified) = self.modified_program_memory();

        Snapshot {
            pc: self.pc,
            stack: self.stack,
            sp: self.sp,
            registers: self.registers,
            i: self.i,
            delay: self.dt,
            sound: self.st,
            halted: self.halted,
            key_table: self.keypad.get_key_table(),
            display_mode: self.display_mode,
            vram: self.vram.clone(),
            flag_regs: self.flag_regs,
            modified_memory_lower_bound: lower as u16,
            modified_memory: modified,
        }
    }

    /// Restore a previously captured snapshot. Assumes the same ROM this
    /// snapshot was taken against is already loaded; the ROM bytes
    /// themselves are not part of the snapshot.
    ///
    /// Every fallible check runs before any field is touched, so a
    /// rejected snapshot (including a hand-edited or stale one, loaded
    /// from an untrusted save-state file) leaves the CPU exactly as it
    /// was.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;

        let lower = snapshot.modified_memory_lower_bound as usize;
        let rom_copy_len = lower - ROM_START;

        if rom_copy_len > self.rom.len() {
            return Err(SnapshotError::RomTooShort {
                needed: rom_copy_len,
                available: self.rom.len(),
            });
        }

        let mut memory = build_memory(&self.rom[..rom_copy_len]);
        let upper = lower + snapshot.modified_memory.len();
        memory[lower..upper].copy_from_slice(&snapshot.modified_memory);

        self.memory = memory;
        self.keypad.set_key_table(snapshot.key_table);
        self.set_display_mode(snapshot.display_mode);
        self.vram = snapshot.vram;
        self.pc = snapshot.pc;
        self.stack = snapshot.stack;
        self.sp = snapshot.sp;
        self.registers = snapshot.registers;
        self.i = snapshot.i;
        self.dt = snapshot.delay;
        self.st = snapshot.sound;
        self.halted = snapshot.halted;
        self.flag_regs = snapshot.flag_regs;
        self.fault = None;

        Ok(())
    }

    /// Compute the lower bound and contents of the contiguous range of
    /// program memory that differs from the original ROM image.
    fn modified_program_memory(&self) -> (usize, Vec<u8>) {
        let mut upper_bound = ROM_START;

        for i in (ROM_START..MEMORY_SIZE).rev() {
            if self.memory[i] != 0 {
                upper_bound = i + 1;
                break;
            }
        }

        let mut lower_bound = ROM_START;
        let rom_limit = (self.rom.len() + ROM_START).min(upper_bound);

        for i in ROM_START..rom_limit {
            if self.memory[i] != self.rom[i - ROM_START] {
                lower_bound = i;
                break;
            }
        }

        (lower_bound, self.memory[lower_bound..upper_bound].to_vec())
    }

    /// Switch display mode, clearing and resizing the framebuffer and
    /// notifying the display collaborator.
    fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
        self.vram = vec![0; mode.pixel_count()];
        let (w, h) = mode.dimensions();
        self.display.set_display_properties(w, h);
    }

    /// Fetch the two bytes at `pc` as a big-endian instruction.
    fn fetch(&self) -> u16 {
        let hi = self.mem_read(self.pc as usize);
        let lo = self.mem_read(self.pc as usize + 1);
        u16::from_be_bytes([hi, lo])
    }

    /// Read a byte of memory. Addresses are masked to the 4 KiB space
    /// rather than bounds-checked, so out-of-range reads wrap instead of
    /// panicking.
    fn mem_read(&self, addr: usize) -> u8 {
        self.memory[addr & 0xFFF]
    }

    /// Write a byte of memory, masked the same way as [`CPU::mem_read`].
    fn mem_write(&mut self, addr: usize, value: u8) {
        self.memory[addr & 0xFFF] = value;
    }

    fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    fn skip_if(&mut self, condition: bool) {
        self.pc = self.pc.wrapping_add(if condition { 4 } else { 2 });
    }

    fn push_return_address(&mut self, address: u16) -> Result<(), CpuFault> {
        if self.sp as usize >= self.stack.len() {
            return Err(CpuFault::StackOverflow);
        }

        self.stack[self.sp as usize] = address;
        self.sp += 1;
        Ok(())
    }

    fn pop_return_address(&mut self) -> Result<u16, CpuFault> {
        if self.sp == 0 {
            return Err(CpuFault::StackUnderflow);
        }

        self.sp -= 1;
        Ok(self.stack[self.sp as usize])
    }

    fn raise_fault(&mut self, fault: CpuFault) {
        warn!("{}", fault);
        self.fault = Some(fault);
        self.halted = true;
    }
}

/// Reject ROMs that would not fit in the program area.
fn validate_rom_size(rom_bytes: &[u8]) -> Result<(), RomError> {
    if rom_bytes.len() > MAX_ROM_SIZE {
        return Err(RomError::TooLarge {
            len: rom_bytes.len(),
            max: MAX_ROM_SIZE,
        });
    }

    Ok(())
}

/// Build a fresh 4 KiB memory image: both font tables, zero padding, and
/// the ROM at `0x200`.
fn build_memory(rom_bytes: &[u8]) -> Box<[u8; MEMORY_SIZE]> {
    let mut memory = Box::new([0u8; MEMORY_SIZE]);

    memory[SMALL_FONT_BASE..SMALL_FONT_BASE + SMALL_FONT.len()].copy_from_slice(&SMALL_FONT);
    memory[LARGE_FONT_BASE..LARGE_FONT_BASE + LARGE_FONT.len()].copy_from_slice(&LARGE_FONT);
    memory[ROM_START..ROM_START + rom_bytes.len()].copy_from_slice(rom_bytes);

    memory
}

/// Instruction dispatch and semantics.
impl<K: Keypad, D: DisplaySink> CPU<K, D> {
    fn dispatch(&mut self, d: Decoded) {
        match (d.nibble, d.x, d.y, d.n) {
            (0x0, 0x0, 0xC, _) => self.op_00cn(d.n),
            (0x0, 0x0, 0xE, 0x0) => self.op_00e0(),
            (0x0, 0x0, 0xE, 0xE) => self.op_00ee(),
            (0x0, 0x0, 0xF, 0xB) => self.op_00fb(),
            (0x0, 0x0, 0xF, 0xC) => self.op_00fc(),
            (0x0, 0x0, 0xF, 0xD) => self.op_00fd(),
            (0x0, 0x0, 0xF, 0xE) => self.op_00fe(),
            (0x0, 0x0, 0xF, 0xF) => self.op_00ff(),

            (0x1, ..) => self.op_1nnn(d.nnn),
            (0x2, ..) => self.op_2nnn(d.nnn),
            (0x3, ..) => self.op_3xnn(d.x, d.nn),
            (0x4, ..) => self.op_4xnn(d.x, d.nn),
            (0x5, _, _, 0x0) => self.op_5xy0(d.x, d.y),
            (0x6, ..) => self.op_6xnn(d.x, d.nn),
            (0x7, ..) => self.op_7xnn(d.x, d.nn),

            (0x8, _, _, 0x0) => self.op_8xy0(d.x, d.y),
            (0x8, _, _, 0x1) => self.op_8xy1(d.x, d.y),
            (0x8, _, _, 0x2) => self.op_8xy2(d.x, d.y),
            (0x8, _, _, 0x3) => self.op_8xy3(d.x, d.y),
            (0x8, _, _, 0x4) => self.op_8xy4(d.x, d.y),
            (0x8, _, _, 0x5) => self.op_8xy5(d.x, d.y),
            (0x8, _, _, 0x6) => self.op_8xy6(d.x, d.y),
            (0x8, _, _, 0x7) => self.op_8xy7(d.x, d.y),
            (0x8, _, _, 0xE) => self.op_8xye(d.x, d.y),

            (0x9, _, _, 0x0) => self.op_9xy0(d.x, d.y),

            (0xA, ..) => self.op_annn(d.nnn),
            (0xB, ..) => self.op_bnnn(d.nnn),
            (0xC, ..) => self.op_cxnn(d.x, d.nn),
            (0xD, ..) => self.op_dxyn(d.x, d.y, d.n),

            (0xE, _, 0x9, 0xE) => self.op_ex9e(d.x),
            (0xE, _, 0xA, 0x1) => self.op_exa1(d.x),

            (0xF, _, 0x0, 0x7) => self.op_fx07(d.x),
            (0xF, _, 0x0, 0xA) => self.op_fx0a(d.x),
            (0xF, _, 0x1, 0x5) => self.op_fx15(d.x),
            (0xF, _, 0x1, 0x8) => self.op_fx18(d.x),
            (0xF, _, 0x1, 0xE) => self.op_fx1e(d.x),
            (0xF, _, 0x2, 0x9) => self.op_fx29(d.x),
            (0xF, _, 0x3, 0x0) => self.op_fx30(d.x),
            (0xF, _, 0x3, 0x3) => self.op_fx33(d.x),
            (0xF, _, 0x5, 0x5) => self.op_fx55(d.x),
            (0xF, _, 0x6, 0x5) => self.op_fx65(d.x),
            (0xF, _, 0x7, 0x5) => self.op_fx75(d.x),
            (0xF, _, 0x8, 0x5) => self.op_fx85(d.x),

            _ => {
                debug!("unknown opcode {:#06X} at {:#05X}, skipping", d.op, self.pc);
                self.advance();
            }
        }
    }

    /// `00E0 CLS` - clear the display.
    fn op_00e0(&mut self) {
        self.vram.iter_mut().for_each(|p| *p = 0);
        self.advance();
    }

    /// `00EE RET` - return from a subroutine.
    fn op_00ee(&mut self) {
        match self.pop_return_address() {
            Ok(addr) => self.pc = addr.wrapping_add(2),
            Err(fault) => self.raise_fault(fault),
        }
    }

    /// `1NNN JMP` - jump to NNN, or halt if NNN is the current instruction
    /// (a self-loop, the idiom many ROMs end on).
    fn op_1nnn(&mut self, nnn: u16) {
        if nnn == self.pc {
            self.op_00fd();
        } else {
            self.pc = nnn;
        }
    }

    /// `2NNN CALL` - call the subroutine at NNN.
    fn op_2nnn(&mut self, nnn: u16) {
        let return_to = self.pc;

        match self.push_return_address(return_to) {
            Ok(()) => self.pc = nnn,
            Err(fault) => self.raise_fault(fault),
        }
    }

    /// `3XNN SE Vx, byte` - skip if VX == NN.
    fn op_3xnn(&mut self, x: usize, nn: u8) {
        self.skip_if(self.registers[x] == nn);
    }

    /// `4XNN SNE Vx, byte` - skip if VX != NN.
    fn op_4xnn(&mut self, x: usize, nn: u8) {
        self.skip_if(self.registers[x] != nn);
    }

    /// `5XY0 SE Vx, Vy` - skip if VX == VY.
    fn op_5xy0(&mut self, x: usize, y: usize) {
        self.skip_if(self.registers[x] == self.registers[y]);
    }

    /// `6XNN LD Vx, byte` - set VX = NN.
    fn op_6xnn(&mut self, x: usize, nn: u8) {
        self.registers[x] = nn;
        self.advance();
    }

    /// `7XNN ADD Vx, byte` - set VX = VX + NN, wrapping, VF unaffected.
    fn op_7xnn(&mut self, x: usize, nn: u8) {
        self.registers[x] = self.registers[x].wrapping_add(nn);
        self.advance();
    }

    /// `8XY0 LD Vx, Vy` - set VX = VY.
    fn op_8xy0(&mut self, x: usize, y: usize) {
        self.registers[x] = self.registers[y];
        self.advance();
    }

    /// `8XY1 OR Vx, Vy`.
    fn op_8xy1(&mut self, x: usize, y: usize) {
        self.registers[x] |= self.registers[y];
        self.advance();
    }

    /// `8XY2 AND Vx, Vy`.
    fn op_8xy2(&mut self, x: usize, y: usize) {
        self.registers[x] &= self.registers[y];
        self.advance();
    }

    /// `8XY3 XOR Vx, Vy`.
    fn op_8xy3(&mut self, x: usize, y: usize) {
        self.registers[x] ^= self.registers[y];
        self.advance();
    }

    /// `8XY4 ADD Vx, Vy` - VF = carry.
    fn op_8xy4(&mut self, x: usize, y: usize) {
        let (result, carry) = self.registers[x].overflowing_add(self.registers[y]);
        self.registers[x] = result;
        self.registers[0xF] = carry as u8;
        self.advance();
    }

    /// `8XY5 SUB Vx, Vy` - VF = NOT borrow.
    fn op_8xy5(&mut self, x: usize, y: usize) {
        let (result, borrow) = self.registers[x].overflowing_sub(self.registers[y]);
        self.registers[x] = result;
        self.registers[0xF] = !borrow as u8;
        self.advance();
    }

    /// `8XY6 SHR Vx {, Vy}` - classic quirk: Vy is ignored, VX shifts
    /// itself right. VF takes the shifted-out bit, normalised to 0/1.
    fn op_8xy6(&mut self, x: usize, _y: usize) {
        let carry = self.registers[x] & 0x1;
        self.registers[x] >>= 1;
        self.registers[0xF] = carry;
        self.advance();
    }

    /// `8XY7 SUBN Vx, Vy` - VX = VY - VX, VF = NOT borrow.
    fn op_8xy7(&mut self, x: usize, y: usize) {
        let (result, borrow) = self.registers[y].overflowing_sub(self.registers[x]);
        self.registers[x] = result;
        self.registers[0xF] = !borrow as u8;
        self.advance();
    }

    /// `8XYE SHL Vx {, Vy}` - classic quirk: Vy is ignored. VF takes bit 7,
    /// normalised to 0/1 (the source instead leaves the raw 0x00/0x80 in
    /// VF; normalising keeps VF a boolean everywhere else in the ISA).
    fn op_8xye(&mut self, x: usize, _y: usize) {
        let carry = (self.registers[x] & 0x80) >> 7;
        self.registers[x] <<= 1;
        self.registers[0xF] = carry;
        self.advance();
    }

    /// `9XY0 SNE Vx, Vy` - skip if VX != VY.
    fn op_9xy0(&mut self, x: usize, y: usize) {
        self.skip_if(self.registers[x] != self.registers[y]);
    }

    /// `ANNN LD I, addr`.
    fn op_annn(&mut self, nnn: u16) {
        self.i = nnn;
        self.advance();
    }

    /// `BNNN JMP V0, addr` - jump to NNN + V0.
    fn op_bnnn(&mut self, nnn: u16) {
        self.pc = nnn.wrapping_add(self.registers[0] as u16);
    }

    /// `CXNN RND Vx, byte`.
    fn op_cxnn(&mut self, x: usize, nn: u8) {
        let r: u8 = self.rng.gen();
        self.registers[x] = r & nn;
        self.advance();
    }

    /// `DXYN DRW Vx, Vy, nibble` - draw a sprite, XOR-compositing into
    /// VRAM, clipping at the screen edges, and setting VF on collision.
    fn op_dxyn(&mut self, vx: usize, vy: usize, n: u8) {
        let (width, height) = self.display_mode.dimensions();
        let x0 = self.registers[vx] as usize;
        let y0 = self.registers[vy] as usize;
        let base = self.i as usize;

        self.registers[0xF] = 0;

        let mut n = n;
        if self.display_mode == DisplayMode::Standard && n == 0 {
            n = 16;
        }

        if n != 0 {
            for row in 0..n as usize {
                let y = y0 + row;
                if y >= height {
                    continue;
                }

                let sprite_byte = self.mem_read(base + row);

                for col in 0..8 {
                    if (sprite_byte >> (7 - col)) & 0x1 == 0 {
                        continue;
                    }

                    let x = x0 + col;
                    if x >= width {
                        continue;
                    }

                    self.xor_pixel(x, y, width);
                }
            }
        } else {
            // N == 0 in Extended mode: a 16x16 sprite, two bytes per row.
            for row in 0..16 {
                let y = y0 + row;
                if y >= height {
                    continue;
                }

                let hi = self.mem_read(base + row * 2);
                let lo = self.mem_read(base + row * 2 + 1);
                let sprite_row = u16::from_be_bytes([hi, lo]);

                for col in 0..16 {
                    if (sprite_row >> (15 - col)) & 0x1 == 0 {
                        continue;
                    }

                    let x = x0 + col;
                    if x >= width {
                        continue;
                    }

                    self.xor_pixel(x, y, width);
                }
            }
        }

        self.advance();
    }

    /// XOR a single pixel into VRAM, setting VF on collision.
    fn xor_pixel(&mut self, x: usize, y: usize, width: usize) {
        let index = y * width + x;

        if self.vram[index] == 1 {
            self.registers[0xF] = 1;
        }

        self.vram[index] ^= 1;
    }

    /// `EX9E SKP Vx` - skip if the key VX is down.
    fn op_ex9e(&mut self, x: usize) {
        self.skip_if(self.keypad.key_is_down(self.registers[x]));
    }

    /// `EXA1 SKNP Vx` - skip if the key VX is up.
    fn op_exa1(&mut self, x: usize) {
        self.skip_if(!self.keypad.key_is_down(self.registers[x]));
    }

    /// `FX07 LD Vx, DT`.
    fn op_fx07(&mut self, x: usize) {
        self.registers[x] = self.dt;
        self.advance();
    }

    /// `FX0A LD Vx, K` - halt until a key is down, then record it in VX.
    /// Re-polled every `step` while halted for this reason, since the
    /// program counter never moves.
    fn op_fx0a(&mut self, x: usize) {
        if self.keypad.key_count() == 0 {
            self.halted = true;
        } else {
            self.registers[x] = self.keypad.last_key();
            self.halted = false;
            self.advance();
        }
    }

    /// `FX15 LD DT, Vx`.
    fn op_fx15(&mut self, x: usize) {
        self.dt = self.registers[x];
        self.advance();
    }

    /// `FX18 LD ST, Vx`.
    fn op_fx18(&mut self, x: usize) {
        self.st = self.registers[x];
        self.advance();
    }

    /// `FX1E ADD I, Vx` - no VF effect, no masking.
    fn op_fx1e(&mut self, x: usize) {
        self.i = self.i.wrapping_add(self.registers[x] as u16);
        self.advance();
    }

    /// `FX29 LD F, Vx` - point I at the small font glyph for VX.
    fn op_fx29(&mut self, x: usize) {
        self.i = (self.registers[x] as u16) * 5 + SMALL_FONT_BASE as u16;
        self.advance();
    }

    /// `FX30 LD HF, Vx` - point I at the large font glyph for VX.
    fn op_fx30(&mut self, x: usize) {
        self.i = (self.registers[x] as u16) * 10 + LARGE_FONT_BASE as u16;
        self.advance();
    }

    /// `FX33 LD B, Vx` - store the BCD digits of VX at I, I+1, I+2.
    fn op_fx33(&mut self, x: usize) {
        let value = self.registers[x];
        let base = self.i as usize;

        self.mem_write(base, value / 100);
        self.mem_write(base + 1, (value / 10) % 10);
        self.mem_write(base + 2, value % 10);
        self.advance();
    }

    /// `FX55 LD [I], Vx` - store V0..=VX at memory[I..]. I is left
    /// unchanged.
    fn op_fx55(&mut self, x: usize) {
        let base = self.i as usize;

        for offset in 0..=x {
            self.mem_write(base + offset, self.registers[offset]);
        }

        self.advance();
    }

    /// `FX65 LD Vx, [I]` - load V0..=VX from memory[I..]. I is left
    /// unchanged.
    fn op_fx65(&mut self, x: usize) {
        let base = self.i as usize;

        for offset in 0..=x {
            self.registers[offset] = self.mem_read(base + offset);
        }

        self.advance();
    }

    /// `FX75 LD R, Vx` - store V0..=VX in the HP-48 flag store, X <= 7.
    fn op_fx75(&mut self, x: usize) {
        let x = x.min(7);
        self.flag_regs[0..=x].copy_from_slice(&self.registers[0..=x]);
        self.advance();
    }

    /// `FX85 LD Vx, R` - load V0..=VX from the HP-48 flag store, X <= 7.
    fn op_fx85(&mut self, x: usize) {
        let x = x.min(7);
        self.registers[0..=x].copy_from_slice(&self.flag_regs[0..=x]);
        self.advance();
    }

    /// `00CN SCD` - scroll down N rows, top rows become 0.
    fn op_00cn(&mut self, n: u8) {
        let (width, height) = self.display_mode.dimensions();
        let n = (n as usize).min(height);
        let retained = height - n;
        let last_index = width * retained;

        self.vram.copy_within(0..last_index, width * n);
        self.vram[0..width * n].iter_mut().for_each(|p| *p = 0);
        self.advance();
    }

    /// `00FB SCR` - scroll right 4 pixels (Extended) or 2 (Standard).
    fn op_00fb(&mut self) {
        let (width, height) = self.display_mode.dimensions();
        let k = self.scroll_amount().min(width);

        for row in 0..height {
            let start = row * width;
            self.vram.copy_within(start..start + width - k, start + k);
            self.vram[start..start + k].iter_mut().for_each(|p| *p = 0);
        }

        self.advance();
    }

    /// `00FC SCL` - scroll left 4 pixels (Extended) or 2 (Standard).
    fn op_00fc(&mut self) {
        let (width, height) = self.display_mode.dimensions();
        let k = self.scroll_amount().min(width);

        for row in 0..height {
            let start = row * width;
            let end = start + width;

            self.vram.copy_within(start + k..end, start);
            self.vram[end - k..end].iter_mut().for_each(|p| *p = 0);
        }

        self.advance();
    }

    fn scroll_amount(&self) -> usize {
        match self.display_mode {
            DisplayMode::Extended => 4,
            DisplayMode::Standard => 2,
        }
    }

    /// `00FD END` - halt the interpreter. Does not advance PC.
    fn op_00fd(&mut self) {
        self.halted = true;
    }

    /// `00FE LOW` - switch to standard (64x32) resolution.
    fn op_00fe(&mut self) {
        self.set_display_mode(DisplayMode::Standard);
        self.advance();
    }

    /// `00FF HIGH` - switch to extended (128x64) resolution.
    fn op_00ff(&mut self) {
        self.set_display_mode(DisplayMode::Extended);
        self.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::NullDisplay;
    use crate::keypad::ArrayKeypad;

    fn cpu_with_rom(rom: &[u8]) -> CPU<ArrayKeypad, NullDisplay> {
        CPU::with_seed(ArrayKeypad::new(), NullDisplay, rom, 0xC0FFEE).unwrap()
    }

    #[test]
    fn registers_stay_in_byte_range_after_arithmetic() {
        let mut cpu = cpu_with_rom(&[0x60, 0xFF, 0x70, 0x02]);
        cpu.step();
        cpu.step();
        assert!(cpu.registers().iter().all(|&v| v <= 0xFF));
        assert_eq!(cpu.registers()[0], 0x01);
    }

    #[test]
    fn call_then_ret_lands_after_the_call() {
        // 2206: CALL 0x206 ; 1204: JMP 0x204 (self loop / halt) ; pad ; 00EE: RET
        let rom = [0x22, 0x06, 0x12, 0x04, 0x00, 0x00, 0x00, 0xEE];
        let mut cpu = cpu_with_rom(&rom);

        let sp_before = cpu.sp;
        cpu.step(); // CALL 0x206
        assert_eq!(cpu.pc, 0x206);

        cpu.step(); // RET
        assert_eq!(cpu.pc, 0x204);
        assert_eq!(cpu.sp, sp_before);
    }

    #[test]
    fn cls_clears_the_framebuffer() {
        let mut cpu = cpu_with_rom(&[0x00, 0xE0]);
        cpu.vram.iter_mut().for_each(|p| *p = 1);
        cpu.step();
        assert!(cpu.framebuffer().iter().all(|&p| p == 0));
    }

    #[test]
    fn bcd_splits_into_hundreds_tens_units() {
        let mut cpu = cpu_with_rom(&[0xF0, 0x33]);
        cpu.registers[0] = 234;
        cpu.i = 0x300;
        cpu.step();
        assert_eq!(cpu.mem_read(0x300), 2);
        assert_eq!(cpu.mem_read(0x301), 3);
        assert_eq!(cpu.mem_read(0x302), 4);
    }

    #[test]
    fn restore_reproduces_the_snapshot() {
        let rom = [0x60, 0x12, 0x61, 0x34, 0xA3, 0x00, 0xD0, 0x15];
        let mut cpu = cpu_with_rom(&rom);

        for _ in 0..4 {
            cpu.step();
        }

        let snap = cpu.snapshot();
        let mut restored = cpu_with_rom(&rom);
        restored.restore(snap.clone()).unwrap();

        assert_eq!(restored.pc, cpu.pc);
        assert_eq!(restored.registers, cpu.registers);
        assert_eq!(restored.i, cpu.i);
        assert_eq!(restored.stack, cpu.stack);
        assert_eq!(restored.sp, cpu.sp);
        assert_eq!(restored.dt, cpu.dt);
        assert_eq!(restored.st, cpu.st);
        assert_eq!(restored.halted, cpu.halted);
        assert_eq!(restored.vram, cpu.vram);
        assert_eq!(restored.display_mode, cpu.display_mode);
        assert_eq!(restored.snapshot(), snap);
    }

    #[test]
    fn restore_rejects_a_snapshot_whose_lower_bound_outgrows_the_loaded_rom() {
        // A snapshot recording a modification at 0x210 implies 16 bytes of
        // unmodified ROM ahead of it. Restoring it onto a CPU with a much
        // shorter ROM must not panic: there aren't enough ROM bytes to
        // rebuild the prefix the snapshot expects.
        let short_rom = [0x00, 0xE0];
        let mut cpu = cpu_with_rom(&short_rom);
        let before = cpu.snapshot();

        let mut snap = before.clone();
        snap.modified_memory_lower_bound = 0x210;
        snap.modified_memory = vec![0xAB];

        let err = cpu.restore(snap).unwrap_err();
        assert_eq!(
            err,
            SnapshotError::RomTooShort {
                needed: 0x10,
                available: short_rom.len(),
            }
        );

        // Rejected restore must leave the CPU exactly as it was.
        assert_eq!(cpu.snapshot(), before);
    }

    #[test]
    fn add_immediate_wraps_mod_256_and_leaves_vf_alone() {
        let mut cpu = cpu_with_rom(&[0x60, 0xFE, 0x70, 0x05, 0x6F, 0x99]);
        cpu.registers[0xF] = 0x99;
        cpu.step();
        cpu.step();
        assert_eq!(cpu.registers[0], 0x03);
        assert_eq!(cpu.registers[0xF], 0x99);
    }

    #[test]
    fn addition_sets_carry_on_overflow() {
        let mut cpu = cpu_with_rom(&[0x80, 0x14]);
        cpu.registers[0] = 0xF0;
        cpu.registers[1] = 0x20;
        cpu.step();
        assert_eq!(cpu.registers[0], 0x10);
        assert_eq!(cpu.registers[0xF], 1);
    }

    #[test]
    fn subtraction_clears_carry_on_borrow() {
        let mut cpu = cpu_with_rom(&[0x80, 0x15]);
        cpu.registers[0] = 0x10;
        cpu.registers[1] = 0x20;
        cpu.step();
        assert_eq!(cpu.registers[0], 0xF0);
        assert_eq!(cpu.registers[0xF], 0);
    }

    #[test]
    fn drawing_the_same_sprite_twice_toggles_it_off_and_reports_collision() {
        let mut cpu = cpu_with_rom(&[0xD0, 0x11]);
        cpu.i = 0x300;
        cpu.mem_write(0x300, 0xFF);

        cpu.step();
        assert_eq!(cpu.registers[0xF], 0);
        assert!(cpu.vram[0..8].iter().all(|&p| p == 1));

        cpu.pc = 0x200;
        cpu.step();
        assert_eq!(cpu.registers[0xF], 1);
        assert!(cpu.vram[0..8].iter().all(|&p| p == 0));
    }

    #[test]
    fn sprite_draw_clips_at_the_screen_edge() {
        let mut cpu = cpu_with_rom(&[0xD0, 0x11]);
        cpu.i = 0x300;
        cpu.mem_write(0x300, 0xFF);
        cpu.registers[0] = 60; // standard width is 64, so 4 columns clip off
        cpu.step();

        let (width, _) = cpu.display_mode.dimensions();
        assert_eq!(width, 64);
        assert_eq!(cpu.vram[60], 1);
        assert_eq!(cpu.vram[63], 1);
    }

    #[test]
    fn timer_decrements_saturate_at_zero() {
        let mut cpu = cpu_with_rom(&[0xF0, 0x07]);
        cpu.dt = 5;
        for _ in 0..10 {
            cpu.decrement_delay_timer();
        }
        assert_eq!(cpu.dt, 0);
        cpu.step();
        assert_eq!(cpu.registers[0], 0);
    }

    #[test]
    fn stack_overflow_is_a_terminal_fault() {
        // CALL self, over and over: the 17th call overflows the 16-deep stack.
        let mut cpu = cpu_with_rom(&[0x22, 0x00]);

        for _ in 0..16 {
            cpu.step();
            cpu.pc = 0x200;
        }

        cpu.step();
        assert!(cpu.is_halted());
        assert_eq!(cpu.fault(), Some(CpuFault::StackOverflow));
    }

    #[test]
    fn ret_on_empty_stack_is_a_terminal_fault() {
        let mut cpu = cpu_with_rom(&[0x00, 0xEE]);
        cpu.step();
        assert!(cpu.is_halted());
        assert_eq!(cpu.fault(), Some(CpuFault::StackUnderflow));
    }

    #[test]
    fn fx0a_halts_until_a_key_is_down() {
        let mut cpu = cpu_with_rom(&[0xF0, 0x0A]);
        cpu.step();
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc, 0x200);

        cpu.keypad_mut().set_key(0x7, true);
        cpu.step();
        assert!(!cpu.is_halted());
        assert_eq!(cpu.registers[0], 0x7);
        assert_eq!(cpu.pc, 0x202);
    }

    #[test]
    fn end_halts_without_advancing_pc() {
        let mut cpu = cpu_with_rom(&[0x00, 0xFD]);
        cpu.step();
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc, 0x200);
        cpu.step();
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc, 0x200);
    }

    #[test]
    fn self_loop_jump_is_treated_as_halt() {
        let mut cpu = cpu_with_rom(&[0x12, 0x00]);
        cpu.step();
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc, 0x200);
    }

    #[test]
    fn extended_mode_resizes_the_framebuffer() {
        let mut cpu = cpu_with_rom(&[0x00, 0xFF]);
        cpu.step();
        assert_eq!(cpu.display_mode(), DisplayMode::Extended);
        assert_eq!(cpu.framebuffer().len(), 128 * 64);
    }

    #[test]
    fn load_store_does_not_modify_i() {
        let mut cpu = cpu_with_rom(&[0xF3, 0x55]);
        cpu.i = 0x300;
        cpu.registers[0] = 1;
        cpu.registers[1] = 2;
        cpu.registers[2] = 3;
        cpu.registers[3] = 4;
        cpu.step();
        assert_eq!(cpu.i, 0x300);
        assert_eq!(cpu.mem_read(0x300), 1);
        assert_eq!(cpu.mem_read(0x303), 4);
    }
}
