//! VGA text-mode console.
//!
//! Unlike a single always-on-screen console, this kernel multiplexes three
//! terminals across one physical framebuffer: the terminal module keeps one
//! [`Writer`] per terminal, each pointed at either the real framebuffer
//! (0xb8000, for whichever terminal is currently displayed) or one of the
//! three backup pages `mm::pagedir` swaps video content through when a
//! terminal is scheduled but not displayed. `Writer` itself only knows how
//! to paint characters into whatever buffer it is told to use.

use core::fmt;

pub const VGA_PHYSICAL_ADDR: usize = 0xb8000;
pub const BUFFER_WIDTH: usize = 80;
pub const BUFFER_HEIGHT: usize = 25;

const CRT_INDEX_PORT: u16 = 0x3D4;
const CRT_DATA_PORT: u16 = 0x3D5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(dead_code)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorCode(u8);

impl ColorCode {
    pub const fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode(((background as u8) << 4) | (foreground as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ScreenChar {
    pub ascii_character: u8,
    pub color_code: ColorCode,
}

#[repr(transparent)]
pub struct Buffer {
    pub chars: [[ScreenChar; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

/// A cursor into a VGA-compatible text buffer. Every field is private so a
/// terminal's writer can be swapped onto a different physical buffer (real
/// framebuffer vs. backup page) without losing its own row/column state.
pub struct Writer {
    column: usize,
    row: usize,
    color_code: ColorCode,
    buffer: *mut Buffer,
    is_onscreen: bool,
}

// SAFETY: `Writer` is only ever accessed behind a `spin::Mutex`, one per
// terminal; the raw pointer never aliases a writer on another thread of
// execution because this kernel has no SMP.
unsafe impl Send for Writer {}

impl Writer {
    pub const fn new(buffer: *mut Buffer, is_onscreen: bool) -> Self {
        Self {
            column: 0,
            row: 0,
            color_code: ColorCode::new(Color::White, Color::Black),
            buffer,
            is_onscreen,
        }
    }

    /// Redirect this writer at a different backing buffer (e.g. when a
    /// terminal is promoted to the real framebuffer or demoted to its
    /// backup page). Cursor position is preserved.
    pub fn retarget(&mut self, buffer: *mut Buffer, is_onscreen: bool) {
        self.buffer = buffer;
        self.is_onscreen = is_onscreen;
    }

    fn cell(&mut self, row: usize, col: usize) -> &mut ScreenChar {
        // SAFETY: row < BUFFER_HEIGHT and col < BUFFER_WIDTH are maintained
        // by every caller in this file; `self.buffer` always points at a
        // live `Buffer`-sized region (real framebuffer or a backup page
        // owned by `mm::pagedir`).
        unsafe { &mut (*self.buffer).chars[row][col] }
    }

    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            0x08 => self.backspace(),
            byte => {
                if self.column >= BUFFER_WIDTH {
                    self.new_line();
                }
                let (row, col) = (self.row, self.column);
                let color_code = self.color_code;
                // SAFETY: framebuffer/backup page memory, written with
                // volatile semantics so the write is never elided.
                unsafe {
                    core::ptr::write_volatile(
                        self.cell(row, col),
                        ScreenChar {
                            ascii_character: byte,
                            color_code,
                        },
                    );
                }
                self.column += 1;
            }
        }
        self.sync_cursor();
    }

    fn backspace(&mut self) {
        if self.column > 0 {
            self.column -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.column = BUFFER_WIDTH - 1;
        }
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color_code,
        };
        let (row, col) = (self.row, self.column);
        // SAFETY: see `write_byte`.
        unsafe {
            core::ptr::write_volatile(self.cell(row, col), blank);
        }
    }

    fn new_line(&mut self) {
        if self.row + 1 < BUFFER_HEIGHT {
            self.row += 1;
        } else {
            for row in 1..BUFFER_HEIGHT {
                for col in 0..BUFFER_WIDTH {
                    // SAFETY: row/col bounded by the loop ranges above.
                    let ch = unsafe { core::ptr::read_volatile(self.cell(row, col)) };
                    unsafe {
                        core::ptr::write_volatile(self.cell(row - 1, col), ch);
                    }
                }
            }
            self.clear_row(BUFFER_HEIGHT - 1);
        }
        self.column = 0;
    }

    pub fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color_code,
        };
        for col in 0..BUFFER_WIDTH {
            // SAFETY: row supplied by callers within [0, BUFFER_HEIGHT).
            unsafe {
                core::ptr::write_volatile(self.cell(row, col), blank);
            }
        }
    }

    pub fn clear_screen(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
        self.row = 0;
        self.column = 0;
        self.sync_cursor();
    }

    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | 0x08 => self.write_byte(byte),
                _ => self.write_byte(0xfe),
            }
        }
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.column)
    }

    /// Move the hardware text-mode cursor. Only meaningful -- and only
    /// performed -- when this writer is the one currently on real video
    /// memory; a backgrounded terminal's cursor position is just state.
    fn sync_cursor(&self) {
        if !self.is_onscreen {
            return;
        }
        let pos = (self.row * BUFFER_WIDTH + self.column) as u16;
        // SAFETY: standard CRT controller cursor-location-register sequence.
        unsafe {
            x86::io::outb(CRT_INDEX_PORT, 0x0F);
            x86::io::outb(CRT_DATA_PORT, (pos & 0xFF) as u8);
            x86::io::outb(CRT_INDEX_PORT, 0x0E);
            x86::io::outb(CRT_DATA_PORT, (pos >> 8) as u8);
        }
    }
}

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}
