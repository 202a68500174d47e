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

use std::{fs, thread::sleep, time::Duration};

use chip8_core::{ArrayKeypad, DisplaySink, NullDisplay, Snapshot, CPU};
use clap::{App, Arg};
use log::{error, info};
use sdl2::{event::Event, keyboard::Keycode, EventPump};

mod audio;
mod graphics;

/// Cycles executed per frame. At 60 frames per second this yields roughly
/// 600 instructions per second, a reasonable default for most ROMs.
const CYCLES_PER_FRAME: u32 = 10;

/// Main entrypoint.
fn main() {
    env_logger::init();

    let matches = App::new("Ferrous Chip-8")
        .version("0.1.0")
        .about("A simple, accurate (super) Chip-8 emulator written in Rust.")
        .arg(
            Arg::with_name("file")
                .help("The ROM file to execute")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("save")
                .help("Path to write a save-state to on exit")
                .short("s")
                .long("save")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("load")
                .help("Path to a save-state to resume from")
                .short("l")
                .long("load")
                .takes_value(true),
        )
        .get_matches();

    let path = matches.value_of("file").unwrap();
    let save_path = matches.value_of("save");
    let load_path = matches.value_of("load");

    let rom = fs::read(path).unwrap_or_else(|err| {
        error!("could not read ROM at {}: {}", path, err);
        std::process::exit(1);
    });

    let mut cpu = CPU::new(ArrayKeypad::new(), NullDisplay, &rom).unwrap_or_else(|err| {
        error!("could not load ROM: {}", err);
        std::process::exit(1);
    });

    if let Some(load_path) = load_path {
        match load_snapshot(load_path) {
            Ok(snapshot) => {
                if let Err(err) = cpu.restore(snapshot) {
                    error!("save-state at {} is invalid: {}", load_path, err);
                    std::process::exit(1);
                }
                info!("resumed from save-state at {}", load_path);
            }
            Err(err) => {
                error!("could not read save-state at {}: {}", load_path, err);
                std::process::exit(1);
            }
        }
    }

    let context = sdl2::init().unwrap();
    let mut event_pump = context.event_pump().unwrap();

    let mut renderer = graphics::Renderer::new(&context);
    let audio_handler = audio::Audio::new();

    'main: loop {
        for _ in 0..CYCLES_PER_FRAME {
            cpu.step();
        }

        cpu.decrement_delay_timer();
        cpu.decrement_sound_timer();

        if handle_events(&mut event_pump, &mut cpu).is_err() {
            break 'main;
        }

        if cpu.sound_timer() > 0 {
            audio_handler.play_beep();
        } else {
            audio_handler.pause_beep();
        }

        let (width, height) = cpu.display_mode().dimensions();
        renderer.render(cpu.framebuffer(), width, height);

        sleep(Duration::from_secs_f64(1.0 / 60.0));
    }

    if let Some(save_path) = save_path {
        if let Err(err) = save_snapshot(save_path, &cpu.snapshot()) {
            error!("could not write save-state to {}: {}", save_path, err);
        } else {
            info!("wrote save-state to {}", save_path);
        }
    }
}

/// Handle keyboard input and the window's quit event. Returns `Err` when
/// the host should exit the main loop.
fn handle_events<D: DisplaySink>(
    event_pump: &mut EventPump,
    cpu: &mut CPU<ArrayKeypad, D>,
) -> Result<(), ()> {
    for event in event_pump.poll_iter() {
        if let Event::Quit { .. } = event {
            return Err(());
        }
    }

    cpu.keypad_mut().release_all();

    let keys: Vec<Keycode> = event_pump
        .keyboard_state()
        .pressed_scancodes()
        .filter_map(Keycode::from_scancode)
        .collect();

    for key in keys {
        if let Some(id) = keycode_to_key(key) {
            cpu.keypad_mut().set_key(id, true);
        }
    }

    Ok(())
}

/// Map a host keyboard key to the standard Chip-8 hex keypad layout:
///
/// ```text
/// 1 2 3 4        1 2 3 C
/// Q W E R   ->   4 5 6 D
/// A S D F        7 8 9 E
/// Z X C V        A 0 B F
/// ```
fn keycode_to_key(key: Keycode) -> Option<u8> {
    match key {
        Keycode::Num1 => Some(0x1),
        Keycode::Num2 => Some(0x2),
        Keycode::Num3 => Some(0x3),
        Keycode::Num4 => Some(0xC),
        Keycode::Q => Some(0x4),
        Keycode::W => Some(0x5),
        Keycode::E => Some(0x6),
        Keycode::R => Some(0xD),
        Keycode::A => Some(0x7),
        Keycode::S => Some(0x8),
        Keycode::D => Some(0x9),
        Keycode::F => Some(0xE),
        Keycode::Z => Some(0xA),
        Keycode::X => Some(0x0),
        Keycode::C => Some(0xB),
        Keycode::V => Some(0xF),
        _ => None,
    }
}

fn load_snapshot(path: &str) -> std::io::Result<Snapshot> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}

fn save_snapshot(path: &str, snapshot: &Snapshot) -> std::io::Result<()> {
    let bytes = serde_json::to_vec(snapshot).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    fs::write(path, bytes)
}
