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

use sdl2::{pixels::Color, rect::Rect, render::Canvas, video::Window, Sdl};

/// Window size, in pixels, regardless of the active Chip-8 resolution: the
/// Standard and Extended framebuffers are scaled to fit it.
const WINDOW_WIDTH: u32 = 1024;
const WINDOW_HEIGHT: u32 = 512;

/// Holds the canvas used to render the interpreter's framebuffer.
pub struct Renderer {
    canvas: Canvas<Window>,
}

impl Renderer {
    /// Return a new `Renderer` instance.
    pub fn new(context: &Sdl) -> Self {
        let video_sys = context.video().unwrap();
        let window = video_sys
            .window("Ferrous Chip-8", WINDOW_WIDTH, WINDOW_HEIGHT)
            .position_centered()
            .build()
            .unwrap();

        let mut canvas = window.into_canvas().build().unwrap();

        canvas.set_draw_color(Color::RGB(0, 0, 0));
        canvas.clear();
        canvas.present();

        Self { canvas }
    }

    /// Render a `width` by `height` framebuffer, one byte per pixel,
    /// scaled up to fill the window.
    pub fn render(&mut self, buffer: &[u8], width: usize, height: usize) {
        let scale_x = WINDOW_WIDTH / width as u32;
        let scale_y = WINDOW_HEIGHT / height as u32;

        self.canvas.set_draw_color(Color::RGB(0, 0, 0));
        self.canvas.clear();

        for row in 0..height {
            let offset = row * width;

            for col in 0..width {
                if buffer[offset + col] == 0 {
                    continue;
                }

                self.canvas.set_draw_color(Color::RGB(255, 255, 255));

                let x = col as i32 * scale_x as i32;
                let y = row as i32 * scale_y as i32;

                let rect = Rect::new(x, y, scale_x, scale_y);
                self.canvas.fill_rect(rect).unwrap();
            }
        }

        self.canvas.present();
    }
}
