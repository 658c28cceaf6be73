//! PS/2 keyboard driver.
//!
//! Reads scancodes from I/O port 0x60 and decodes them with the
//! `pc-keyboard` crate (scan code set 1, US 104-key layout). Modifier and
//! special-key handling -- Alt+F1/F2/F3 to switch the displayed terminal,
//! Ctrl+L to clear it, tab expansion -- is done here rather than left to
//! the decoder, since it has to reach into `terminal` directly.
//!
//! Input always targets the *displayed* terminal (`terminal::displayed`),
//! not the scheduled one: a user typing into a background terminal would
//! make no sense.

use lazy_static::lazy_static;
use pc_keyboard::{layouts::Us104Key, DecodedKey, HandleControl, KeyCode, KeyState, Keyboard, ScancodeSet1};
use spin::Mutex;

use crate::{process::TerminalId, terminal};

const KEYBOARD_DATA_PORT: u16 = 0x60;

struct State {
    decoder: Keyboard<Us104Key, ScancodeSet1>,
    shift: bool,
    ctrl: bool,
    alt: bool,
}

lazy_static! {
    static ref STATE: Mutex<State> = Mutex::new(State {
        decoder: Keyboard::new(ScancodeSet1::new(), Us104Key, HandleControl::Ignore),
        shift: false,
        ctrl: false,
        alt: false,
    });
}

pub fn init() {
    // No hardware-specific setup beyond unmasking IRQ1, already done by
    // `arch::x86::pic::init`.
}

/// Called from the keyboard ISR (vector 33 / IRQ1).
pub fn on_interrupt() {
    // SAFETY: 0x60 is the PS/2 controller's data port; reading it both
    // retrieves the scancode byte and acknowledges the controller so it
    // releases the next one.
    let scancode = unsafe { x86::io::inb(KEYBOARD_DATA_PORT) };

    let mut state = STATE.lock();
    let event = match state.decoder.add_byte(scancode) {
        Ok(Some(event)) => event,
        _ => return,
    };
    handle_event(&mut state, event);
}

fn handle_event(state: &mut State, event: pc_keyboard::KeyEvent) {
    let down = event.state == KeyState::Down;

    match event.code {
        KeyCode::LShift | KeyCode::RShift => {
            state.shift = down;
            return;
        }
        KeyCode::LControl | KeyCode::RControl => {
            state.ctrl = down;
            return;
        }
        KeyCode::LAlt | KeyCode::RAltGr => {
            state.alt = down;
            return;
        }
        KeyCode::F1 if down && state.alt => {
            terminal::switch_display(TerminalId(0));
            return;
        }
        KeyCode::F2 if down && state.alt => {
            terminal::switch_display(TerminalId(1));
            return;
        }
        KeyCode::F3 if down && state.alt => {
            terminal::switch_display(TerminalId(2));
            return;
        }
        _ => {}
    }

    let Some(decoded) = state.decoder.process_keyevent(event) else {
        return;
    };

    let DecodedKey::Unicode(ch) = decoded else {
        return;
    };

    if state.ctrl && (ch == 'l' || ch == 'L') {
        terminal::clear(terminal::displayed());
        return;
    }

    let target = terminal::displayed();
    if ch == '\t' {
        for _ in 0..4 {
            terminal::on_key(target, ' ');
        }
    } else {
        terminal::on_key(target, ch);
    }
}
